//! Payload gossip message.

use roundtable_types::{NetworkMessage, RoundKind, TxPayload};
use serde::{Deserialize, Serialize};

/// Gossips a participant's payload submission to every other participant.
///
/// The agreement transport must deliver each submission to all participants
/// before the round can close; duplicate delivery from the same sender is
/// rejected by the round itself, not assumed filtered here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadGossip<K> {
    /// The payload being gossiped.
    pub payload: TxPayload<K>,
}

impl<K: RoundKind> PayloadGossip<K> {
    /// Create a new payload gossip message.
    pub fn new(payload: TxPayload<K>) -> Self {
        Self { payload }
    }

    /// Get a reference to the inner payload.
    pub fn payload(&self) -> &TxPayload<K> {
        &self.payload
    }

    /// Consume and return the inner payload.
    pub fn into_payload(self) -> TxPayload<K> {
        self.payload
    }
}

impl<K: RoundKind> NetworkMessage for PayloadGossip<K> {
    fn message_type_id() -> &'static str {
        "payload.gossip"
    }
}
