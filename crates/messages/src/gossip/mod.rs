//! Gossip message types.

mod payload;

pub use payload::PayloadGossip;
