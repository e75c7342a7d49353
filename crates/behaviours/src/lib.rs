//! Behaviour scheduling.
//!
//! A behaviour is a participant's local task bound to one round kind: it
//! performs external work (API fetches, content-store writes, ledger
//! reads), builds a payload, submits it and waits for the replicated round
//! to conclude.
//!
//! Behaviours are expressed as explicit resumable tasks, not threads or
//! futures: each `step` either suspends on exactly one effect, submits a
//! payload, or cedes. The runner performs the I/O and the node delivers
//! the resumption value back. Suspension points are therefore exactly the
//! two the protocol allows - awaiting an external response and awaiting
//! round resolution - and every resumption is explicit.

mod api_spec;
mod retry;
mod scheduler;
mod task;

pub use api_spec::{ApiSpec, FieldKind};
pub use retry::RetryPolicy;
pub use scheduler::{BehaviourContext, BehaviourSet, SchedulerState};
pub use task::{Behaviour, Effect, Progress, Resumption, Step};
