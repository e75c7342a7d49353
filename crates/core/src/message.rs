//! Outbound message types for network communication.

use roundtable_messages::PayloadGossip;

/// Outbound network messages.
///
/// These are the messages that a node can send to other participants.
/// The runner handles the actual network I/O.
#[derive(Debug, Clone)]
pub enum OutboundMessage<K> {
    /// A payload submission for the current round.
    Payload(PayloadGossip<K>),
}

impl<K> OutboundMessage<K> {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Payload(_) => "Payload",
        }
    }
}
