//! Core types for the Roundtable agreement engine.
//!
//! This crate provides the foundational vocabulary shared by every other
//! crate: participant identity, committee membership and threshold math,
//! content hashes, and the payload model that rounds agree on.

mod committee;
mod event;
mod hash;
mod identifiers;
mod payload;

pub use committee::{has_supermajority, Committee, CommitteeError, StaticCommittee};
pub use event::Event;
pub use hash::{ContentHash, HexError};
pub use identifiers::ParticipantId;
pub use payload::{FieldValue, RoundKind, TxPayload};

/// A message that can be carried by the gossip transport.
///
/// The type id names the gossip topic the message is published on.
pub trait NetworkMessage {
    /// Stable identifier for topic-based dispatch.
    fn message_type_id() -> &'static str;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
