//! Test fixtures shared across crates.

use crate::{Committee, FieldValue, ParticipantId, RoundKind, StaticCommittee, TxPayload};
use std::sync::Arc;

/// Build a committee of `size` participants with ids `0..size`.
pub fn test_committee(size: u64, local: u64) -> Arc<dyn Committee> {
    let participants: Vec<_> = (0..size).map(ParticipantId).collect();
    StaticCommittee::new(ParticipantId(local), participants).into_arc()
}

/// Build a payload carrying a single integer field.
pub fn test_payload<K: RoundKind>(sender: u64, round: K, value: i64) -> TxPayload<K> {
    TxPayload::new(
        ParticipantId(sender),
        round,
        vec![FieldValue::Int(value)],
    )
}
