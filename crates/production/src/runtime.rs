//! The tokio node loop and collaborator seams.

use crate::{encode_message, TimerManager, Topic};
use async_trait::async_trait;
use roundtable_core::{
    Action, ApiRequest, ApiResponse, IoError, LedgerQuery, LedgerValue, NodeInput, StateMachine,
    TimerScheduler,
};
use roundtable_node::NodeStateMachine;
use roundtable_types::{ContentHash, RoundKind};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// The agreement transport seam.
///
/// Implementations must deliver every published message to every
/// participant, including the publisher; the engine depends on seeing its
/// own submissions come back through the same path as everyone else's.
#[async_trait]
pub trait GossipTransport: Send + Sync {
    /// Publish a message on a topic.
    async fn broadcast(&self, topic: Topic, data: Vec<u8>) -> Result<(), IoError>;
}

/// The external data source seam.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform a request and return the raw response.
    async fn get(&self, request: ApiRequest) -> Result<ApiResponse, IoError>;
}

/// The content-addressed storage seam.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store data and return its content hash.
    async fn put(&self, data: Vec<u8>) -> Result<ContentHash, IoError>;
}

/// The read-only ledger seam.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Perform a read-only query.
    async fn call(&self, query: LedgerQuery) -> Result<LedgerValue, IoError>;
}

/// Drives one participant node on a tokio runtime.
///
/// Inputs arrive on an mpsc channel: decoded gossip (fed by the embedder
/// through [`NodeRunner::input_sender`]), timer firings, and collaborator
/// completions from spawned tasks. Actions fan out to the collaborator
/// trait objects.
pub struct NodeRunner<K: RoundKind> {
    node: NodeStateMachine<K>,
    input_rx: mpsc::Receiver<NodeInput<K>>,
    input_tx: mpsc::Sender<NodeInput<K>>,
    timers: TimerManager<K>,
    transport: Arc<dyn GossipTransport>,
    api: Arc<dyn ApiClient>,
    store: Arc<dyn ContentStore>,
    ledger: Arc<dyn LedgerClient>,
    started_at: Instant,
}

impl<K: RoundKind> NodeRunner<K> {
    /// Create a runner around a built node.
    pub fn new(
        node: NodeStateMachine<K>,
        transport: Arc<dyn GossipTransport>,
        api: Arc<dyn ApiClient>,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::channel(256);
        let timers = TimerManager::new(input_tx.clone());

        Self {
            node,
            input_rx,
            input_tx,
            timers,
            transport,
            api,
            store,
            ledger,
            started_at: Instant::now(),
        }
    }

    /// Get a sender for feeding inputs, e.g. decoded incoming gossip.
    pub fn input_sender(&self) -> mpsc::Sender<NodeInput<K>> {
        self.input_tx.clone()
    }

    /// Run until the application terminates or halts.
    ///
    /// Returns the node so the embedder can read the final synchronized
    /// data.
    pub async fn run(mut self) -> NodeStateMachine<K> {
        self.dispatch(NodeInput::Genesis);

        while !self.node.is_terminated() && !self.node.is_halted() {
            let Some(input) = self.input_rx.recv().await else {
                warn!("Input channel closed, stopping node");
                break;
            };
            self.dispatch(input);
        }

        self.timers.cancel_all();
        info!(
            terminated = self.node.is_terminated(),
            halted = self.node.is_halted(),
            "Node run finished"
        );
        self.node
    }

    fn dispatch(&mut self, input: NodeInput<K>) {
        self.node.set_time(self.started_at.elapsed());
        let actions = self.node.handle(input);
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: Action<K>) {
        match action {
            Action::Broadcast { message } => match encode_message(&message) {
                Ok((topic, bytes)) => {
                    let transport = Arc::clone(&self.transport);
                    tokio::spawn(async move {
                        if let Err(err) = transport.broadcast(topic, bytes).await {
                            warn!(error = %err, "Gossip broadcast failed");
                        }
                    });
                }
                Err(err) => error!(error = %err, "Failed to encode outbound message"),
            },

            Action::SetTimer { id, duration } => self.timers.set_timer(id, duration),
            Action::CancelTimer { id } => self.timers.cancel_timer(id),

            Action::HttpRequest {
                request_id,
                request,
            } => {
                let api = Arc::clone(&self.api);
                let input_tx = self.input_tx.clone();
                tokio::spawn(async move {
                    let result = api.get(request).await;
                    let _ = input_tx
                        .send(NodeInput::ApiResponseReceived { request_id, result })
                        .await;
                });
            }

            Action::StoragePut { request_id, data } => {
                let store = Arc::clone(&self.store);
                let input_tx = self.input_tx.clone();
                tokio::spawn(async move {
                    let result = store.put(data).await;
                    let _ = input_tx
                        .send(NodeInput::StoragePutCompleted { request_id, result })
                        .await;
                });
            }

            Action::LedgerCall { request_id, query } => {
                let ledger = Arc::clone(&self.ledger);
                let input_tx = self.input_tx.clone();
                tokio::spawn(async move {
                    let result = ledger.call(query).await;
                    let _ = input_tx
                        .send(NodeInput::LedgerCallCompleted { request_id, result })
                        .await;
                });
            }

            Action::EmitRoundResolved { round, event, next } => {
                info!(%round, %event, %next, "Round resolved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_message;
    use roundtable_behaviours::{Behaviour, BehaviourContext, Progress, Step};
    use roundtable_node::NodeConfig;
    use roundtable_rounds::{AbciAppSpec, Event, RoundDef};
    use roundtable_test_helpers::{test_committee, TestRound};
    use roundtable_types::{FieldValue, TxPayload};
    use std::time::Duration;

    /// Submits a constant value straight away.
    struct SubmitSeven;

    impl Behaviour<TestRound> for SubmitSeven {
        fn matching_round(&self) -> TestRound {
            TestRound::Collect
        }

        fn step(
            &mut self,
            _step: Step,
            ctx: &BehaviourContext<'_, TestRound>,
        ) -> Progress<TestRound> {
            Progress::Submit(TxPayload::new(
                ctx.sender,
                TestRound::Collect,
                vec![FieldValue::Int(7)],
            ))
        }
    }

    /// Decodes every broadcast back into the node's own input channel.
    struct Loopback {
        input_tx: mpsc::Sender<NodeInput<TestRound>>,
    }

    #[async_trait]
    impl GossipTransport for Loopback {
        async fn broadcast(&self, topic: Topic, data: Vec<u8>) -> Result<(), IoError> {
            let input = decode_message::<TestRound>(topic, &data)
                .map_err(|e| IoError::Decode(e.to_string()))?;
            self.input_tx
                .send(input)
                .await
                .map_err(|e| IoError::Network(e.to_string()))
        }
    }

    struct NoCollaborator;

    #[async_trait]
    impl ApiClient for NoCollaborator {
        async fn get(&self, _request: ApiRequest) -> Result<ApiResponse, IoError> {
            Err(IoError::Network("not wired in this test".to_string()))
        }
    }

    #[async_trait]
    impl ContentStore for NoCollaborator {
        async fn put(&self, _data: Vec<u8>) -> Result<ContentHash, IoError> {
            Err(IoError::Storage("not wired in this test".to_string()))
        }
    }

    #[async_trait]
    impl LedgerClient for NoCollaborator {
        async fn call(&self, _query: LedgerQuery) -> Result<LedgerValue, IoError> {
            Err(IoError::Network("not wired in this test".to_string()))
        }
    }

    fn test_spec() -> AbciAppSpec<TestRound> {
        AbciAppSpec::builder(TestRound::Collect)
            .round(RoundDef::collect(
                TestRound::Collect,
                Event::Done,
                Event::NoMajority,
                "participant_to_collect",
                &["value"],
            ))
            .round(RoundDef::degenerate(TestRound::Finished))
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_participant_run_to_termination() {
        let node = NodeStateMachine::new(
            test_spec(),
            test_committee(1, 0),
            NodeConfig::with_block_interval(Duration::from_millis(50)),
            vec![Box::new(SubmitSeven)],
        )
        .unwrap();

        let collaborators = Arc::new(NoCollaborator);
        let mut runner = NodeRunner::new(
            node,
            // Placeholder transport, replaced below once the input channel
            // exists.
            Arc::new(Loopback {
                input_tx: mpsc::channel(1).0,
            }),
            collaborators.clone(),
            collaborators.clone(),
            collaborators,
        );
        runner.transport = Arc::new(Loopback {
            input_tx: runner.input_sender(),
        });

        let node = tokio::time::timeout(Duration::from_secs(10), runner.run())
            .await
            .expect("run should terminate");

        assert!(node.is_terminated());
        assert_eq!(
            node.db().get_scalar("value").unwrap(),
            &FieldValue::Int(7)
        );
    }
}
