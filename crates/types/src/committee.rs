//! Committee trait and static implementation.

use crate::ParticipantId;
use std::sync::Arc;

/// Check if a submission count meets the BFT supermajority threshold (> 2/3).
pub fn has_supermajority(submitted: usize, total: usize) -> bool {
    submitted * 3 > total * 2
}

/// The set of participants that must reach agreement.
///
/// The committee is the single source of truth for membership, ordering and
/// threshold math. Participants are held in ascending identifier order, and
/// every node must construct the committee from the same membership list so
/// that indices and tie-breaks agree everywhere.
pub trait Committee: Send + Sync {
    /// Get the local participant's ID.
    fn local_participant(&self) -> ParticipantId;

    /// Get the ordered participant list.
    fn participants(&self) -> &[ParticipantId];

    // Derived methods

    /// Get the number of participants.
    fn size(&self) -> usize {
        self.participants().len()
    }

    /// Get the index of a participant in the ordered list.
    fn index_of(&self, participant: ParticipantId) -> Option<usize> {
        self.participants().iter().position(|p| *p == participant)
    }

    /// Check if a participant is a member.
    fn contains(&self, participant: ParticipantId) -> bool {
        self.index_of(participant).is_some()
    }

    /// Check if the given submission count meets the threshold (> 2/3).
    fn has_threshold(&self, submitted: usize) -> bool {
        has_supermajority(submitted, self.size())
    }

    /// Get the minimum number of identical submissions required to conclude
    /// a round with agreement.
    fn threshold(&self) -> usize {
        (self.size() * 2 / 3) + 1
    }
}

/// Errors that can occur when validating committee membership.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitteeError {
    /// Participant is not a member of the committee.
    #[error("participant {0} is not in the committee")]
    NotAMember(ParticipantId),
}

/// A static committee implementation.
///
/// Membership is fixed at construction. The participant list is sorted and
/// deduplicated so that all nodes derive the same ordering from the same
/// membership, regardless of the order it was supplied in.
#[derive(Debug, Clone)]
pub struct StaticCommittee {
    local_participant: ParticipantId,
    participants: Vec<ParticipantId>,
}

impl StaticCommittee {
    /// Create a new static committee.
    pub fn new(local_participant: ParticipantId, mut participants: Vec<ParticipantId>) -> Self {
        participants.sort();
        participants.dedup();

        Self {
            local_participant,
            participants,
        }
    }

    /// Create a committee as an Arc.
    pub fn into_arc(self) -> Arc<dyn Committee> {
        Arc::new(self)
    }
}

impl Committee for StaticCommittee {
    fn local_participant(&self) -> ParticipantId {
        self.local_participant
    }

    fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_committee(size: u64, local: u64) -> StaticCommittee {
        let participants: Vec<_> = (0..size).map(ParticipantId).collect();
        StaticCommittee::new(ParticipantId(local), participants)
    }

    #[test]
    fn test_committee_basics() {
        let committee = make_test_committee(4, 0);

        assert_eq!(committee.size(), 4);
        assert_eq!(committee.local_participant(), ParticipantId(0));
        assert_eq!(committee.index_of(ParticipantId(2)), Some(2));
        assert!(committee.contains(ParticipantId(3)));
        assert!(!committee.contains(ParticipantId(4)));
    }

    #[test]
    fn test_membership_order_is_canonical() {
        let shuffled = StaticCommittee::new(
            ParticipantId(1),
            vec![ParticipantId(3), ParticipantId(1), ParticipantId(2), ParticipantId(3)],
        );
        assert_eq!(
            shuffled.participants(),
            &[ParticipantId(1), ParticipantId(2), ParticipantId(3)]
        );
    }

    #[test]
    fn test_threshold() {
        let committee = make_test_committee(4, 0);

        assert_eq!(committee.threshold(), 3);
        assert!(!committee.has_threshold(2));
        assert!(committee.has_threshold(3));
        assert!(committee.has_threshold(4));
    }

    #[test]
    fn test_supermajority_boundary_conditions() {
        // Safety requires STRICTLY GREATER than 2/3.
        // Formula: submitted * 3 > total * 2

        // Exact 2/3 should NOT meet the threshold
        assert!(!has_supermajority(6, 9), "Exactly 2/3 should not suffice");

        // Just over 2/3 should
        assert!(has_supermajority(7, 10), "Just over 2/3 should suffice");

        // Just under 2/3 should not
        assert!(!has_supermajority(6, 10), "60% should not suffice");

        // Smallest BFT committee: n=3 needs all 3
        assert!(!has_supermajority(2, 3));
        assert!(has_supermajority(3, 3));

        // n=4 (3f+1, f=1): need 3 (2f+1)
        assert!(!has_supermajority(2, 4));
        assert!(has_supermajority(3, 4));

        // n=7: need 5
        assert!(!has_supermajority(4, 7));
        assert!(has_supermajority(5, 7));

        // Degenerate cases
        assert!(has_supermajority(1, 1));
        assert!(!has_supermajority(0, 1));
        assert!(!has_supermajority(0, 0));
    }
}
