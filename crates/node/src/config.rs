//! Node configuration.

use std::time::Duration;

/// Participant node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Interval between block boundaries; each boundary evaluates the
    /// active round's `end_block` once.
    pub block_interval: Duration,

    /// Time budget for a round when the application spec configures none.
    pub default_round_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            block_interval: Duration::from_millis(500),
            default_round_timeout: Duration::from_secs(30),
        }
    }
}

impl NodeConfig {
    /// Create a config with a custom block interval.
    pub fn with_block_interval(block_interval: Duration) -> Self {
        Self {
            block_interval,
            ..Default::default()
        }
    }
}
