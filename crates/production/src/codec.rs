//! Message encoding and decoding for network transport.
//!
//! # Wire Format
//!
//! Gossip messages are JSON-encoded. Message type is determined by the
//! gossip topic, not by a field in the message; this keeps the wire
//! format flat and lets the transport route without decoding.

use roundtable_core::{NodeInput, OutboundMessage};
use roundtable_messages::PayloadGossip;
use roundtable_types::RoundKind;
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("JSON decode error: {0}")]
    JsonDecode(String),

    #[error("JSON encode error: {0}")]
    JsonEncode(String),

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
}

/// Topic string for payload gossip.
const PAYLOAD_TOPIC: &str = "payload.gossip";

/// Gossip topics, one per message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Payload submissions.
    Payload,
}

impl Topic {
    /// The topic string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Payload => PAYLOAD_TOPIC,
        }
    }

    /// Parse a topic string.
    pub fn parse(topic: &str) -> Result<Self, CodecError> {
        if topic == PAYLOAD_TOPIC {
            Ok(Topic::Payload)
        } else {
            Err(CodecError::UnknownTopic(topic.to_string()))
        }
    }
}

/// Encode an outbound message to wire format.
///
/// Returns the topic to publish on and the encoded bytes.
pub fn encode_message<K: RoundKind>(
    message: &OutboundMessage<K>,
) -> Result<(Topic, Vec<u8>), CodecError> {
    match message {
        OutboundMessage::Payload(gossip) => {
            let bytes = serde_json::to_vec(gossip)
                .map_err(|e| CodecError::JsonEncode(e.to_string()))?;
            Ok((Topic::Payload, bytes))
        }
    }
}

/// Decode a message from wire format based on topic.
pub fn decode_message<K: RoundKind>(
    topic: Topic,
    data: &[u8],
) -> Result<NodeInput<K>, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyMessage);
    }

    match topic {
        Topic::Payload => {
            let gossip: PayloadGossip<K> = serde_json::from_slice(data)
                .map_err(|e| CodecError::JsonDecode(e.to_string()))?;
            Ok(NodeInput::PayloadReceived { gossip })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_test_helpers::{collect_payload, TestRound};
    use roundtable_types::NetworkMessage;

    #[test]
    fn test_encode_decode_roundtrip() {
        let message =
            OutboundMessage::Payload(PayloadGossip::new(collect_payload(2, 7)));

        let (topic, bytes) = encode_message(&message).unwrap();
        assert_eq!(topic, Topic::Payload);

        let input: NodeInput<TestRound> = decode_message(topic, &bytes).unwrap();
        let NodeInput::PayloadReceived { gossip } = input else {
            panic!("expected a payload input");
        };
        assert_eq!(gossip.payload(), &collect_payload(2, 7));
    }

    #[test]
    fn test_topic_matches_message_type_id() {
        assert_eq!(
            Topic::Payload.as_str(),
            PayloadGossip::<TestRound>::message_type_id()
        );
    }

    #[test]
    fn test_unknown_topic_rejected() {
        assert!(matches!(
            Topic::parse("block.vote"),
            Err(CodecError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(matches!(
            decode_message::<TestRound>(Topic::Payload, &[]),
            Err(CodecError::EmptyMessage)
        ));
    }
}
