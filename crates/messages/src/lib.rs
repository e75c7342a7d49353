//! Network messages for the agreement protocol.

pub mod gossip;

// Re-export commonly used types
pub use gossip::PayloadGossip;
