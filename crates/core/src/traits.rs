//! Core traits for state machines.

use crate::{Action, NodeInput};
use roundtable_types::RoundKind;
use std::time::Duration;

/// A state machine that processes node inputs.
///
/// This is the core abstraction for the agreement architecture.
/// All round-sequencing logic is implemented as state machines that:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + input = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine<OracleRound> for NodeStateMachine<OracleRound> {
///     fn handle(&mut self, input: NodeInput<OracleRound>) -> Vec<Action<OracleRound>> {
///         match input {
///             NodeInput::TimerFired { id: TimerId::Block } => self.on_block_timer(),
///             NodeInput::PayloadReceived { gossip } => self.on_payload(gossip),
///             // ... etc
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine<K: RoundKind> {
    /// Process an input, returning actions to perform.
    ///
    /// # Guarantees
    ///
    /// - **Synchronous**: This method never blocks or awaits
    /// - **Deterministic**: Given the same state and input, always returns the same actions
    /// - **No I/O**: All I/O is performed by the runner via the returned actions
    fn handle(&mut self, input: NodeInput<K>) -> Vec<Action<K>>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call to provide the
    /// current simulation or wall-clock time.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}
