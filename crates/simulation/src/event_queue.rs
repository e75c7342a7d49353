//! Deterministic ordering for queued inputs.

use crate::NodeIndex;
use roundtable_core::{InputPriority, NodeInput};
use std::cmp::Ordering;
use std::time::Duration;

/// Ordering key for the simulation's input queue.
///
/// Inputs are processed in `(time, priority, node, sequence)` order, which
/// makes a run a pure function of the seed and the initial configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// When this input should be processed.
    pub time: Duration,
    /// Priority for ordering at the same time.
    pub priority: InputPriority,
    /// Which node receives this input.
    pub node_index: NodeIndex,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

impl EventKey {
    /// Create a new event key from a [`NodeInput`].
    pub fn new<K>(
        time: Duration,
        input: &NodeInput<K>,
        node_index: NodeIndex,
        sequence: u64,
    ) -> Self {
        Self {
            time,
            priority: input.priority(),
            node_index,
            sequence,
        }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Order by time first
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by priority (Timer < Network < Client)
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Then by node index (deterministic ordering)
        match self.node_index.cmp(&other.node_index) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Finally by sequence (FIFO within the same node)
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ms: u64, priority: InputPriority, node: NodeIndex, seq: u64) -> EventKey {
        EventKey {
            time: Duration::from_millis(ms),
            priority,
            node_index: node,
            sequence: seq,
        }
    }

    #[test]
    fn test_ordering_time_first() {
        let earlier = key(1, InputPriority::Client, 5, 9);
        let later = key(2, InputPriority::Timer, 0, 0);
        assert!(earlier < later);
    }

    #[test]
    fn test_ordering_priority_within_time() {
        let timer = key(1, InputPriority::Timer, 5, 9);
        let network = key(1, InputPriority::Network, 0, 0);
        assert!(timer < network);
    }

    #[test]
    fn test_ordering_sequence_last() {
        let first = key(1, InputPriority::Network, 0, 1);
        let second = key(1, InputPriority::Network, 0, 2);
        assert!(first < second);
    }
}
