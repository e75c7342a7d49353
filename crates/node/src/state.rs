//! The participant node state machine.

use crate::NodeConfig;
use roundtable_behaviours::{
    Behaviour, BehaviourContext, BehaviourSet, Effect, Progress, Resumption,
};
use roundtable_core::{
    Action, NodeInput, OutboundMessage, RequestId, StateMachine, TimerId,
};
use roundtable_messages::PayloadGossip;
use roundtable_rounds::{AbciApp, AbciAppSpec, AppError, Resolution, RoundError, SynchronizedData};
use roundtable_types::{Committee, RoundKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The kind of collaborator work a pending request id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Api,
    Storage,
    Ledger,
}

/// A complete participant node.
///
/// Composes the round-transition engine and the behaviour scheduler into
/// one deterministic state machine. All I/O happens through the returned
/// actions; collaborator results and gossip come back as inputs.
pub struct NodeStateMachine<K> {
    config: NodeConfig,
    committee: Arc<dyn Committee>,
    app: AbciApp<K>,
    behaviours: BehaviourSet<K>,

    /// The single outstanding collaborator request, if any.
    ///
    /// A response whose id does not match is stale work abandoned by a
    /// round transition and is dropped.
    pending_request: Option<(RequestId, PendingKind)>,

    /// Whether the active behaviour is waiting out a retry backoff.
    sleeping: bool,

    /// Monotonic request id source.
    next_request_id: u64,

    /// Set when a fatal protocol or invariant error stopped the run.
    halted: bool,

    /// Current node time.
    now: Duration,
}

impl<K: RoundKind> NodeStateMachine<K> {
    /// Create a node positioned at the application's initial round.
    ///
    /// Fails when the validated spec still cannot start, e.g. an initial
    /// round whose pre-conditions the empty store cannot satisfy.
    pub fn new(
        spec: AbciAppSpec<K>,
        committee: Arc<dyn Committee>,
        config: NodeConfig,
        behaviours: Vec<Box<dyn Behaviour<K>>>,
    ) -> Result<Self, AppError<K>> {
        let app = AbciApp::new(spec, Arc::clone(&committee))?;

        let mut set = BehaviourSet::new();
        for behaviour in behaviours {
            set.register(behaviour);
        }

        Ok(Self {
            config,
            committee,
            app,
            behaviours: set,
            pending_request: None,
            sleeping: false,
            next_request_id: 0,
            halted: false,
            now: Duration::ZERO,
        })
    }

    /// Get the active round kind.
    pub fn current_round(&self) -> K {
        self.app.current_round()
    }

    /// Check if the application run has terminated in a final state.
    pub fn is_terminated(&self) -> bool {
        self.app.is_terminated()
    }

    /// Check if a fatal error halted the node.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Get the synchronized data store.
    pub fn db(&self) -> &SynchronizedData<K> {
        self.app.db()
    }

    fn alloc_request_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }

    fn round_timeout(&self) -> Duration {
        self.app
            .round_timeout()
            .unwrap_or(self.config.default_round_timeout)
    }

    /// Convert behaviour progress into runner actions.
    fn apply_progress(&mut self, progress: Progress<K>) -> Vec<Action<K>> {
        match progress {
            Progress::Await(Effect::HttpGet(request)) => {
                let request_id = self.alloc_request_id();
                self.pending_request = Some((request_id, PendingKind::Api));
                vec![Action::HttpRequest {
                    request_id,
                    request,
                }]
            }
            Progress::Await(Effect::StoragePut(data)) => {
                let request_id = self.alloc_request_id();
                self.pending_request = Some((request_id, PendingKind::Storage));
                vec![Action::StoragePut { request_id, data }]
            }
            Progress::Await(Effect::LedgerCall(query)) => {
                let request_id = self.alloc_request_id();
                self.pending_request = Some((request_id, PendingKind::Ledger));
                vec![Action::LedgerCall { request_id, query }]
            }
            Progress::Await(Effect::Sleep(duration)) => {
                self.sleeping = true;
                vec![Action::SetTimer {
                    id: TimerId::Retry,
                    duration,
                }]
            }
            Progress::Submit(payload) => {
                debug!(round = %payload.round(), "Broadcasting payload");
                vec![Action::Broadcast {
                    message: OutboundMessage::Payload(PayloadGossip::new(payload)),
                }]
            }
            Progress::Ceded => {
                warn!(
                    round = %self.app.current_round(),
                    "Behaviour ceded without submitting"
                );
                vec![]
            }
        }
    }

    /// Start the behaviour for the (re-)entered current round.
    ///
    /// Abandons any in-flight collaborator work: a round transition is the
    /// only cancellation mechanism, and stale responses are dropped by
    /// request id.
    fn enter_current_round(&mut self) -> Vec<Action<K>> {
        self.pending_request = None;
        self.sleeping = false;

        let mut actions = vec![Action::CancelTimer { id: TimerId::Retry }];

        if self.app.is_terminated() {
            info!(round = %self.app.current_round(), "Run terminated");
            actions.push(Action::CancelTimer {
                id: TimerId::RoundTimeout,
            });
            actions.push(Action::CancelTimer { id: TimerId::Block });
            return actions;
        }

        actions.push(Action::SetTimer {
            id: TimerId::RoundTimeout,
            duration: self.round_timeout(),
        });

        let ctx = BehaviourContext {
            sender: self.committee.local_participant(),
            db: self.app.db(),
            now: self.now,
        };
        let progress = self.behaviours.enter_round(self.app.current_round(), &ctx);

        if let Some(progress) = progress {
            actions.extend(self.apply_progress(progress));
        }
        actions
    }

    /// Apply a round resolution: notify observers and enter the successor.
    fn apply_resolution(&mut self, resolution: Resolution<K>) -> Vec<Action<K>> {
        let mut actions = vec![Action::EmitRoundResolved {
            round: resolution.round,
            event: resolution.event,
            next: resolution.next,
        }];
        actions.extend(self.enter_current_round());
        actions
    }

    /// Stop the node after a fatal error.
    fn halt(&mut self, err: &AppError<K>) -> Vec<Action<K>> {
        error!(error = %err, round = %self.app.current_round(), "Fatal error, halting run");
        self.halted = true;
        vec![
            Action::CancelTimer { id: TimerId::Block },
            Action::CancelTimer {
                id: TimerId::RoundTimeout,
            },
            Action::CancelTimer { id: TimerId::Retry },
        ]
    }

    fn on_genesis(&mut self) -> Vec<Action<K>> {
        info!(
            participant = %self.committee.local_participant(),
            round = %self.app.current_round(),
            "Node starting"
        );

        let mut actions = vec![Action::SetTimer {
            id: TimerId::Block,
            duration: self.config.block_interval,
        }];
        actions.extend(self.enter_current_round());
        actions
    }

    fn on_block_timer(&mut self) -> Vec<Action<K>> {
        let mut actions = vec![];

        match self.app.end_block() {
            Ok(Some(resolution)) => actions.extend(self.apply_resolution(resolution)),
            Ok(None) => {}
            Err(err) => return self.halt(&err),
        }

        if !self.app.is_terminated() {
            actions.push(Action::SetTimer {
                id: TimerId::Block,
                duration: self.config.block_interval,
            });
        }
        actions
    }

    fn on_round_timeout(&mut self) -> Vec<Action<K>> {
        match self.app.expire_round() {
            Ok(resolution) => self.apply_resolution(resolution),
            Err(err) => self.halt(&err),
        }
    }

    fn on_retry_timer(&mut self) -> Vec<Action<K>> {
        if !self.sleeping {
            debug!("Stale retry timer ignored");
            return vec![];
        }
        self.sleeping = false;
        self.resume(Resumption::SleepElapsed)
    }

    fn on_payload(&mut self, gossip: PayloadGossip<K>) -> Vec<Action<K>> {
        let payload = gossip.into_payload();
        let sender = payload.sender();
        let round = payload.round();

        match self.app.submit(payload) {
            Ok(()) => vec![],
            Err(AppError::Round(RoundError::DuplicateSubmission { .. })) => {
                // The transport is not trusted to filter duplicates;
                // surfaced to the operator, collection unchanged.
                error!(%sender, %round, "Rejected duplicate submission");
                vec![]
            }
            Err(AppError::Round(RoundError::WrongPayloadKind { .. })) => {
                // Expected while transitions propagate: a participant may
                // still gossip for a round we already left.
                warn!(%sender, %round, current = %self.app.current_round(),
                    "Dropped payload for a different round");
                vec![]
            }
            Err(AppError::Round(RoundError::RoundResolved { .. }))
            | Err(AppError::Terminated(_)) => {
                debug!(%sender, %round, "Dropped payload for resolved round");
                vec![]
            }
            Err(AppError::Round(RoundError::UnknownParticipant { .. })) => {
                error!(%sender, %round, "Rejected payload from non-member");
                vec![]
            }
            Err(err) => self.halt(&err),
        }
    }

    /// Resume the suspended behaviour and apply its progress.
    fn resume(&mut self, resumption: Resumption) -> Vec<Action<K>> {
        let ctx = BehaviourContext {
            sender: self.committee.local_participant(),
            db: self.app.db(),
            now: self.now,
        };
        let progress = self.behaviours.resume(resumption, &ctx);

        match progress {
            Some(progress) => self.apply_progress(progress),
            None => vec![],
        }
    }

    /// Validate a collaborator response against the outstanding request.
    fn take_pending(&mut self, request_id: RequestId, kind: PendingKind) -> bool {
        match self.pending_request {
            Some((pending_id, pending_kind))
                if pending_id == request_id && pending_kind == kind =>
            {
                self.pending_request = None;
                true
            }
            _ => {
                debug!(%request_id, "Dropped stale collaborator response");
                false
            }
        }
    }
}

impl<K: RoundKind> StateMachine<K> for NodeStateMachine<K> {
    fn handle(&mut self, input: NodeInput<K>) -> Vec<Action<K>> {
        if self.halted {
            debug!(input = input.type_name(), "Node halted, input dropped");
            return vec![];
        }

        match input {
            NodeInput::Genesis => self.on_genesis(),
            NodeInput::TimerFired { id: TimerId::Block } => self.on_block_timer(),
            NodeInput::TimerFired {
                id: TimerId::RoundTimeout,
            } => self.on_round_timeout(),
            NodeInput::TimerFired { id: TimerId::Retry } => self.on_retry_timer(),
            NodeInput::PayloadReceived { gossip } => self.on_payload(gossip),
            NodeInput::ApiResponseReceived { request_id, result } => {
                if !self.take_pending(request_id, PendingKind::Api) {
                    return vec![];
                }
                self.resume(Resumption::Api(result))
            }
            NodeInput::StoragePutCompleted { request_id, result } => {
                if !self.take_pending(request_id, PendingKind::Storage) {
                    return vec![];
                }
                self.resume(Resumption::Storage(result))
            }
            NodeInput::LedgerCallCompleted { request_id, result } => {
                if !self.take_pending(request_id, PendingKind::Ledger) {
                    return vec![];
                }
                self.resume(Resumption::Ledger(result))
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_behaviours::{ApiSpec, Step};
    use roundtable_core::{ApiResponse, IoError};
    use roundtable_rounds::{Event, RoundDef};
    use roundtable_test_helpers::{test_committee, TestRound};
    use roundtable_types::{FieldValue, ParticipantId, TxPayload};
    use tracing_test::traced_test;

    /// Fetches one value and submits it; retries are exercised through the
    /// scripted runner tests in the simulation crate.
    struct FetchAndSubmit;

    impl Behaviour<TestRound> for FetchAndSubmit {
        fn matching_round(&self) -> TestRound {
            TestRound::Collect
        }

        fn step(
            &mut self,
            step: Step,
            ctx: &BehaviourContext<'_, TestRound>,
        ) -> Progress<TestRound> {
            match step {
                Step::Start => Progress::Await(Effect::HttpGet(
                    ApiSpec::get("https://example.com/value").request(),
                )),
                Step::Resume(Resumption::Api(Ok(_))) => Progress::Submit(TxPayload::new(
                    ctx.sender,
                    TestRound::Collect,
                    vec![FieldValue::Int(7)],
                )),
                Step::Resume(_) => Progress::Ceded,
            }
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

    fn make_node() -> NodeStateMachine<TestRound> {
        NodeStateMachine::new(
            test_spec(),
            test_committee(4, 0),
            NodeConfig::default(),
            vec![Box::new(FetchAndSubmit)],
        )
        .unwrap()
    }

    fn api_ok() -> Result<ApiResponse, IoError> {
        Ok(ApiResponse {
            status: 200,
            body: b"{}".to_vec(),
        })
    }

    fn payload_input(sender: u64, value: i64) -> NodeInput<TestRound> {
        NodeInput::PayloadReceived {
            gossip: PayloadGossip::new(TxPayload::new(
                ParticipantId(sender),
                TestRound::Collect,
                vec![FieldValue::Int(value)],
            )),
        }
    }

    fn find_request_id(actions: &[Action<TestRound>]) -> RequestId {
        actions
            .iter()
            .find_map(|a| match a {
                Action::HttpRequest { request_id, .. } => Some(*request_id),
                _ => None,
            })
            .expect("expected an HttpRequest action")
    }

    #[traced_test]
    #[test]
    fn test_genesis_arms_timers_and_starts_behaviour() {
        let mut node = make_node();

        let actions = node.handle(NodeInput::Genesis);

        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SetTimer {
                id: TimerId::Block,
                ..
            }
        )));
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::SetTimer {
                id: TimerId::RoundTimeout,
                ..
            }
        )));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::HttpRequest { .. })));
    }

    #[traced_test]
    #[test]
    fn test_api_response_leads_to_broadcast() {
        let mut node = make_node();
        let actions = node.handle(NodeInput::Genesis);
        let request_id = find_request_id(&actions);

        let actions = node.handle(NodeInput::ApiResponseReceived {
            request_id,
            result: api_ok(),
        });

        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Broadcast { .. })));
    }

    #[traced_test]
    #[test]
    fn test_stale_api_response_is_dropped() {
        let mut node = make_node();
        node.handle(NodeInput::Genesis);

        let actions = node.handle(NodeInput::ApiResponseReceived {
            request_id: RequestId::new(999),
            result: api_ok(),
        });
        assert!(actions.is_empty());
    }

    #[traced_test]
    #[test]
    fn test_threshold_round_trip_terminates_run() {
        let mut node = make_node();
        let actions = node.handle(NodeInput::Genesis);
        let request_id = find_request_id(&actions);
        node.handle(NodeInput::ApiResponseReceived {
            request_id,
            result: api_ok(),
        });

        // Own payload comes back through the transport, plus two peers.
        node.handle(payload_input(0, 7));
        node.handle(payload_input(1, 7));
        node.handle(payload_input(2, 7));

        let actions = node.handle(NodeInput::TimerFired { id: TimerId::Block });

        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitRoundResolved {
                event: Event::Done,
                next: TestRound::Finished,
                ..
            }
        )));
        assert!(node.is_terminated());
        assert_eq!(
            node.db().get_scalar("value").unwrap(),
            &FieldValue::Int(7)
        );

        // Block timer is not re-armed after termination.
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::SetTimer { id: TimerId::Block, .. })));
    }

    #[traced_test]
    #[test]
    fn test_round_timeout_restarts_behaviour() {
        let mut node = make_node();
        node.handle(NodeInput::Genesis);
        node.handle(payload_input(1, 7));

        let actions = node.handle(NodeInput::TimerFired {
            id: TimerId::RoundTimeout,
        });

        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EmitRoundResolved {
                event: Event::RoundTimeout,
                next: TestRound::Collect,
                ..
            }
        )));
        // Behaviour re-entered: a fresh fetch goes out with a new id.
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::HttpRequest { .. })));
        assert_eq!(node.current_round(), TestRound::Collect);
        assert!(!node.is_terminated());
    }

    #[traced_test]
    #[test]
    fn test_duplicate_gossip_rejected_without_halting() {
        let mut node = make_node();
        node.handle(NodeInput::Genesis);

        node.handle(payload_input(1, 7));
        node.handle(payload_input(1, 8));

        assert!(!node.is_halted());
        // Block boundary: only one payload counted.
        node.handle(NodeInput::TimerFired { id: TimerId::Block });
        assert!(!node.is_terminated());
    }

    #[traced_test]
    #[test]
    fn test_in_flight_work_abandoned_on_timeout() {
        let mut node = make_node();
        let actions = node.handle(NodeInput::Genesis);
        let request_id = find_request_id(&actions);

        // Round times out while the fetch is still in flight; the
        // behaviour restarts with a new request id.
        node.handle(NodeInput::TimerFired {
            id: TimerId::RoundTimeout,
        });

        // The old response arrives late and must be dropped.
        let actions = node.handle(NodeInput::ApiResponseReceived {
            request_id,
            result: api_ok(),
        });
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::Broadcast { .. })));
    }
}
