//! Deterministic simulation runner.
//!
//! This crate provides a fully deterministic simulation environment for
//! testing the agreement engine. Given the same seed, it produces
//! identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Input Queue (BTreeMap<EventKey, NodeInput>)    │ │
//! │  │     Ordered by: time, priority, node, sequence     │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     nodes: Vec<NodeStateMachine>                   │ │
//! │  │     Each processes inputs sequentially             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → schedule new inputs                  │ │
//! │  │     (gossip, timers, scripted collaborators)       │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod collab;
mod event_queue;
mod network;
mod runner;

pub use collab::{ApiScript, SimApiSource, SimContentStore, SimLedger};
pub use event_queue::EventKey;
pub use network::{NetworkConfig, SimulatedNetwork};
pub use runner::{SimulationRunner, SimulationStats};

/// Type alias for deterministic node indexing in simulation.
///
/// This is a simulation-only concept for routing between in-process
/// nodes; the protocol itself identifies participants by `ParticipantId`.
pub type NodeIndex = u32;
