//! Shared fixtures for round and committee testing.

use roundtable_types::{Committee, FieldValue, ParticipantId, StaticCommittee, TxPayload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A minimal round kind set used across engine tests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TestRound {
    /// A collect-same-until-threshold round.
    Collect,
    /// A second collecting round, for wrong-kind and reachability tests.
    Other,
    /// A degenerate final round.
    Finished,
}

impl fmt::Display for TestRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestRound::Collect => write!(f, "collect"),
            TestRound::Other => write!(f, "other"),
            TestRound::Finished => write!(f, "finished"),
        }
    }
}

/// Build a committee of `size` participants with ids `0..size`.
pub fn test_committee(size: u64, local: u64) -> Arc<dyn Committee> {
    let participants: Vec<_> = (0..size).map(ParticipantId).collect();
    StaticCommittee::new(ParticipantId(local), participants).into_arc()
}

/// Build a single-field integer payload for [`TestRound::Collect`].
pub fn collect_payload(sender: u64, value: i64) -> TxPayload<TestRound> {
    TxPayload::new(
        ParticipantId(sender),
        TestRound::Collect,
        vec![FieldValue::Int(value)],
    )
}
