//! Production runner.
//!
//! The deterministic node state machine performs no I/O; this crate is
//! the runtime side for real deployments: a tokio loop that feeds inputs
//! to the node, executes its actions against collaborator trait objects,
//! and converts completions back into inputs.

mod codec;
mod runtime;
mod timers;

pub use codec::{decode_message, encode_message, CodecError, Topic};
pub use runtime::{ApiClient, ContentStore, GossipTransport, LedgerClient, NodeRunner};
pub use timers::TimerManager;
