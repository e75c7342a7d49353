//! Deterministic simulation runner.
//!
//! Processes inputs in deterministic order and executes actions inline:
//! gossip goes through the simulated network, collaborator calls are
//! answered from per-node scripts, timers land back in the queue. Given
//! the same seed and scripts, a run produces identical results every time.

use crate::event_queue::EventKey;
use crate::network::{NetworkConfig, SimulatedNetwork};
use crate::{NodeIndex, SimApiSource, SimContentStore, SimLedger};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use roundtable_core::{Action, NodeInput, StateMachine, TimerId};
use roundtable_node::NodeStateMachine;
use roundtable_rounds::{Resolution, SynchronizedData};
use roundtable_types::RoundKind;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total inputs processed.
    pub inputs_processed: u64,
    /// Total actions generated.
    pub actions_generated: u64,
    /// Gossip deliveries scheduled.
    pub messages_sent: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Timers cancelled.
    pub timers_cancelled: u64,
}

/// Deterministic simulation runner.
///
/// Each node is an independent participant with its own scripted
/// collaborators and content store; only the simulated network connects
/// them.
pub struct SimulationRunner<K: RoundKind> {
    /// All nodes in the simulation, indexed by NodeIndex.
    nodes: Vec<NodeStateMachine<K>>,

    /// Global input queue, ordered deterministically.
    queue: BTreeMap<EventKey, NodeInput<K>>,

    /// Sequence counter for deterministic ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// Network simulator.
    network: SimulatedNetwork,

    /// RNG for network conditions (seeded for determinism).
    rng: ChaCha8Rng,

    /// Timer registry for cancellation support.
    /// Maps (node, timer_id) -> event_key for removal.
    timers: HashMap<(NodeIndex, TimerId), EventKey>,

    /// Scripted external data source.
    api: SimApiSource,

    /// Per-node content-addressed store.
    stores: Vec<SimContentStore>,

    /// Shared read-only ledger.
    ledger: SimLedger,

    /// Log of every round resolution any node observed.
    resolutions: Vec<(NodeIndex, Resolution<K>)>,

    /// Statistics.
    stats: SimulationStats,
}

impl<K: RoundKind> SimulationRunner<K> {
    /// Create a runner over pre-built nodes.
    pub fn new(
        nodes: Vec<NodeStateMachine<K>>,
        network_config: NetworkConfig,
        api: SimApiSource,
        ledger: SimLedger,
        seed: u64,
    ) -> Self {
        let num_nodes = nodes.len();
        info!(num_nodes, seed, "Created simulation runner");

        Self {
            nodes,
            queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            network: SimulatedNetwork::new(network_config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            timers: HashMap::new(),
            api,
            stores: (0..num_nodes).map(|_| SimContentStore::new()).collect(),
            ledger,
            resolutions: Vec::new(),
            stats: SimulationStats::default(),
        }
    }

    /// Get current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get a reference to a node by index.
    pub fn node(&self, index: NodeIndex) -> Option<&NodeStateMachine<K>> {
        self.nodes.get(index as usize)
    }

    /// Get a node's synchronized data store.
    pub fn db(&self, index: NodeIndex) -> Option<&SynchronizedData<K>> {
        self.node(index).map(|n| n.db())
    }

    /// Get a node's content store.
    pub fn content_store(&self, index: NodeIndex) -> Option<&SimContentStore> {
        self.stores.get(index as usize)
    }

    /// Every resolution observed, in processing order.
    pub fn resolutions(&self) -> &[(NodeIndex, Resolution<K>)] {
        &self.resolutions
    }

    /// Check if every node has terminated its run.
    pub fn all_terminated(&self) -> bool {
        self.nodes.iter().all(|n| n.is_terminated())
    }

    /// Enqueue genesis for every node at time zero.
    pub fn start(&mut self) {
        for node in 0..self.nodes.len() as NodeIndex {
            self.schedule(node, Duration::ZERO, NodeInput::Genesis);
        }
    }

    /// Run until the queue drains or simulation time passes `max_time`.
    pub fn run(&mut self, max_time: Duration) {
        while let Some(entry) = self.queue.first_key_value() {
            if entry.0.time > max_time {
                debug!(now = ?self.now, "Simulation time budget reached");
                break;
            }
            self.step();
        }
    }

    /// Process a single queued input.
    pub fn step(&mut self) {
        let Some((key, input)) = self.queue.pop_first() else {
            return;
        };

        self.now = key.time;
        let node_index = key.node_index;

        // Drop the timer registration the key belonged to.
        if let NodeInput::TimerFired { id } = &input {
            if self.timers.get(&(node_index, *id)) == Some(&key) {
                self.timers.remove(&(node_index, *id));
            }
        }

        trace!(
            node = node_index,
            input = input.type_name(),
            time = ?self.now,
            "Processing input"
        );

        let node = &mut self.nodes[node_index as usize];
        node.set_time(self.now);
        let actions = node.handle(input);

        self.stats.inputs_processed += 1;
        self.stats.actions_generated += actions.len() as u64;

        for action in actions {
            self.execute(node_index, action);
        }
    }

    fn schedule(&mut self, node: NodeIndex, at: Duration, input: NodeInput<K>) -> EventKey {
        let key = EventKey::new(at, &input, node, self.sequence);
        self.sequence += 1;
        self.queue.insert(key, input);
        key
    }

    /// Execute one action emitted by `node`.
    fn execute(&mut self, node: NodeIndex, action: Action<K>) {
        match action {
            Action::Broadcast { message } => {
                let roundtable_core::OutboundMessage::Payload(gossip) = message;

                // Deliver to every participant, including the sender.
                for target in 0..self.nodes.len() as NodeIndex {
                    for _ in 0..self.network.copies() {
                        let delay = self.network.delivery_delay(&mut self.rng);
                        self.schedule(
                            target,
                            self.now + delay,
                            NodeInput::PayloadReceived {
                                gossip: gossip.clone(),
                            },
                        );
                        self.stats.messages_sent += 1;
                    }
                }
            }

            Action::SetTimer { id, duration } => {
                // Setting an already-pending timer replaces it.
                if let Some(old_key) = self.timers.remove(&(node, id)) {
                    self.queue.remove(&old_key);
                }
                let key = self.schedule(node, self.now + duration, NodeInput::TimerFired { id });
                self.timers.insert((node, id), key);
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(key) = self.timers.remove(&(node, id)) {
                    self.queue.remove(&key);
                    self.stats.timers_cancelled += 1;
                }
            }

            Action::HttpRequest {
                request_id,
                request,
            } => {
                let result = self.api.respond(node, &request);
                let delay = self.network.delivery_delay(&mut self.rng);
                self.schedule(
                    node,
                    self.now + delay,
                    NodeInput::ApiResponseReceived { request_id, result },
                );
            }

            Action::StoragePut { request_id, data } => {
                let hash = self.stores[node as usize].put(data);
                let delay = self.network.delivery_delay(&mut self.rng);
                self.schedule(
                    node,
                    self.now + delay,
                    NodeInput::StoragePutCompleted {
                        request_id,
                        result: Ok(hash),
                    },
                );
            }

            Action::LedgerCall { request_id, query } => {
                let result = self.ledger.call(&query);
                let delay = self.network.delivery_delay(&mut self.rng);
                self.schedule(
                    node,
                    self.now + delay,
                    NodeInput::LedgerCallCompleted { request_id, result },
                );
            }

            Action::EmitRoundResolved { round, event, next } => {
                debug!(node, %round, %event, %next, "Round resolved");
                self.resolutions
                    .push((node, Resolution { round, event, next }));
            }
        }
    }
}
