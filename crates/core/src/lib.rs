//! Core types for Roundtable nodes.
//!
//! This crate provides the foundational types for the node architecture:
//!
//! - [`NodeInput`]: All possible inputs to a node
//! - [`Action`]: All possible outputs from the state machine
//! - [`InputPriority`]: Ordering priority for inputs at the same timestamp
//! - [`StateMachine`]: The trait that node state machines implement
//!
//! # Architecture
//!
//! ```text
//! NodeInput → StateMachine::handle() → Vec<Action>
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + input = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner (simulation or production) which:
//! 1. Delivers inputs to the state machine
//! 2. Executes the returned actions (gossip, timers, HTTP, storage, ledger)
//! 3. Converts action results back into inputs

mod action;
mod collab;
mod input;
mod message;
mod request;
mod timer;
mod traits;

pub use action::Action;
pub use collab::{ApiRequest, ApiResponse, IoError, LedgerQuery, LedgerValue};
pub use input::{InputPriority, NodeInput};
pub use message::OutboundMessage;
pub use request::RequestId;
pub use timer::{TimerId, TimerScheduler};
pub use traits::StateMachine;
