//! Timer scheduling abstraction.
//!
//! The state machine emits `Action::SetTimer` and `Action::CancelTimer`.
//! This trait abstracts the runtime side:
//! - Production: `TimerManager` spawns tokio tasks
//! - Simulation: inserts into a deterministic event queue

use std::time::Duration;

/// Timer identification for scheduled inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Consensus block cadence; each fire evaluates `end_block` once.
    Block,
    /// Time budget of the current round.
    RoundTimeout,
    /// Backoff delay before a behaviour retries a failed collaborator call.
    Retry,
}

/// Abstraction for scheduling and cancelling timers.
///
/// Implementations convert timer requests into runtime-specific mechanisms:
/// - The production `TimerManager` uses `tokio::spawn` + `tokio::time::sleep`
/// - Simulation inserts into a seeded deterministic event queue
pub trait TimerScheduler {
    fn set_timer(&mut self, id: TimerId, duration: Duration);
    fn cancel_timer(&mut self, id: TimerId);
}
