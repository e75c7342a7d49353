//! Round-transition and threshold-collection engine.
//!
//! This crate provides the replicated round state machine: rounds collect
//! one payload per participant, conclude once a threshold of identical
//! values is reached, and the application advances along a statically
//! validated transition table.
//!
//! # Architecture
//!
//! - [`SynchronizedData`]: the versioned store of agreed values, written
//!   only by round resolution
//! - [`CollectSameUntilThresholdRound`]: accumulates payloads and decides
//!   when a quorum of identical value tuples exists
//! - [`AbciAppSpec`]: the static application definition (round registry,
//!   transition table, timeouts, pre/post conditions), validated at
//!   assembly time
//! - [`AbciApp`]: the runtime that instantiates rounds, applies events
//!   and advances exactly once per resolved round

mod app;
mod error;
mod round;
mod spec;
mod sync_data;

pub use app::{AbciApp, Resolution};
pub use error::{AppError, RoundError, SpecError, SyncDataError};
pub use round::{CollectSameUntilThresholdRound, DegenerateRound};
pub use spec::{AbciAppSpec, AbciAppSpecBuilder, RoundDef, RoundModel, TransitionTable};
pub use sync_data::{SyncValue, SynchronizedData};

pub use roundtable_types::Event;
