//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identifier.
///
/// Participants are totally ordered by their identifier. This ordering is
/// part of the protocol: deterministic tie-breaking during threshold
/// selection relies on every node agreeing on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Participant({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_ordering() {
        let mut ids = vec![ParticipantId(3), ParticipantId(0), ParticipantId(2)];
        ids.sort();
        assert_eq!(
            ids,
            vec![ParticipantId(0), ParticipantId(2), ParticipantId(3)]
        );
    }
}
