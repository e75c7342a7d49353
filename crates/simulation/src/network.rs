//! Simulated agreement transport.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Network conditions for a simulation run.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Base one-way delivery latency.
    pub base_latency: Duration,

    /// Maximum random jitter added on top of the base latency.
    pub jitter: Duration,

    /// Deliver every gossip message twice.
    ///
    /// The transport promises eventual delivery, not exactly-once; this
    /// exercises the rounds' duplicate rejection.
    pub duplicate_delivery: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_latency: Duration::from_millis(20),
            jitter: Duration::from_millis(10),
            duplicate_delivery: false,
        }
    }
}

/// Stand-in for the agreement transport.
///
/// Every broadcast is delivered to every participant, including the
/// sender; only latency (and optional duplication) varies.
#[derive(Debug, Clone)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
}

impl SimulatedNetwork {
    /// Create a network with the given conditions.
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    /// Sample the delivery delay for one message.
    pub fn delivery_delay(&self, rng: &mut ChaCha8Rng) -> Duration {
        let jitter_nanos = self.config.jitter.as_nanos() as u64;
        let jitter = if jitter_nanos == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rng.gen_range(0..=jitter_nanos))
        };
        self.config.base_latency + jitter
    }

    /// How many copies of each message to deliver.
    pub fn copies(&self) -> u32 {
        if self.config.duplicate_delivery {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_delay_is_within_bounds() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..100 {
            let delay = network.delivery_delay(&mut rng);
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(30));
        }
    }

    #[test]
    fn test_same_seed_same_delays() {
        let network = SimulatedNetwork::new(NetworkConfig::default());
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);

        let delays_a: Vec<_> = (0..10).map(|_| network.delivery_delay(&mut rng_a)).collect();
        let delays_b: Vec<_> = (0..10).map(|_| network.delivery_delay(&mut rng_b)).collect();
        assert_eq!(delays_a, delays_b);
    }
}
