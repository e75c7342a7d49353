//! The per-round behaviour scheduler.

use crate::{Behaviour, Progress, Resumption, Step};
use indexmap::IndexMap;
use roundtable_rounds::SynchronizedData;
use roundtable_types::{ParticipantId, RoundKind};
use std::time::Duration;
use tracing::{debug, warn};

/// Read-only view a behaviour steps against.
pub struct BehaviourContext<'a, K> {
    /// The local participant's identity; payloads are built with it.
    pub sender: ParticipantId,

    /// The synchronized data store, for reading agreed state.
    pub db: &'a SynchronizedData<K>,

    /// Current node time.
    pub now: Duration,
}

/// What the scheduler's active behaviour is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState<K> {
    /// No behaviour active (no behaviour registered for the round, or the
    /// run terminated).
    Idle,

    /// The behaviour for `round` is suspended on an I/O effect.
    AwaitingIo {
        /// The bound round.
        round: K,
    },

    /// The behaviour for `round` submitted its payload and is suspended
    /// until the round resolves.
    AwaitingRoundEnd {
        /// The bound round.
        round: K,
    },

    /// The behaviour for `round` ceded without submitting.
    Ceded {
        /// The bound round.
        round: K,
    },
}

/// Registry and scheduler for behaviours.
///
/// One behaviour is registered per round kind; exactly one is active at a
/// time. On every round entry - first entry, self-loop re-entry after a
/// no-majority or timeout, or a transition to a new kind - the behaviour
/// bound to the entered round is restarted from [`Step::Start`]. A
/// behaviour that expected forward progress therefore never resumes into a
/// stale round: it observes the re-entry as a fresh start, which is what
/// makes its local side effects at-least-once.
pub struct BehaviourSet<K> {
    behaviours: IndexMap<K, Box<dyn Behaviour<K>>>,
    state: SchedulerState<K>,
}

impl<K: RoundKind> Default for BehaviourSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RoundKind> BehaviourSet<K> {
    /// Create an empty behaviour set.
    pub fn new() -> Self {
        Self {
            behaviours: IndexMap::new(),
            state: SchedulerState::Idle,
        }
    }

    /// Register a behaviour under its matching round kind.
    ///
    /// A later registration for the same kind replaces the earlier one.
    pub fn register(&mut self, behaviour: Box<dyn Behaviour<K>>) {
        self.behaviours.insert(behaviour.matching_round(), behaviour);
    }

    /// Get the scheduler state.
    pub fn state(&self) -> SchedulerState<K> {
        self.state
    }

    /// Start (or restart) the behaviour bound to an entered round.
    ///
    /// Returns the behaviour's first progress, or `None` when no behaviour
    /// is registered for the round (final rounds have none).
    pub fn enter_round(
        &mut self,
        round: K,
        ctx: &BehaviourContext<'_, K>,
    ) -> Option<Progress<K>> {
        let Some(behaviour) = self.behaviours.get_mut(&round) else {
            debug!(%round, "No behaviour registered, scheduler idle");
            self.state = SchedulerState::Idle;
            return None;
        };

        debug!(%round, "Starting behaviour");
        let progress = behaviour.step(Step::Start, ctx);
        self.state = Self::state_for(round, &progress);
        Some(progress)
    }

    /// Resume the active behaviour with an I/O resumption value.
    ///
    /// Returns `None` when no behaviour is awaiting I/O; the node drops
    /// stale resumptions (work abandoned by a round timeout) this way.
    pub fn resume(
        &mut self,
        resumption: Resumption,
        ctx: &BehaviourContext<'_, K>,
    ) -> Option<Progress<K>> {
        let round = match self.state {
            SchedulerState::AwaitingIo { round } => round,
            _ => {
                warn!(state = ?self.state, "Dropping resumption, no behaviour awaiting I/O");
                return None;
            }
        };

        // Registered, or we could not be awaiting I/O on it.
        let behaviour = self.behaviours.get_mut(&round)?;
        let progress = behaviour.step(Step::Resume(resumption), ctx);
        self.state = Self::state_for(round, &progress);
        Some(progress)
    }

    fn state_for(round: K, progress: &Progress<K>) -> SchedulerState<K> {
        match progress {
            Progress::Await(_) => SchedulerState::AwaitingIo { round },
            Progress::Submit(_) => SchedulerState::AwaitingRoundEnd { round },
            Progress::Ceded => SchedulerState::Ceded { round },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Effect;
    use roundtable_core::{ApiResponse, IoError};
    use roundtable_test_helpers::TestRound;
    use roundtable_types::{FieldValue, TxPayload};
    use std::time::Duration;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Fetches once, submits the response status as its payload value.
    struct FetchOnce {
        attempts: Arc<AtomicU32>,
    }

    impl Behaviour<TestRound> for FetchOnce {
        fn matching_round(&self) -> TestRound {
            TestRound::Collect
        }

        fn step(
            &mut self,
            step: Step,
            ctx: &BehaviourContext<'_, TestRound>,
        ) -> Progress<TestRound> {
            match step {
                Step::Start => {
                    self.attempts.fetch_add(1, Ordering::Relaxed);
                    Progress::Await(Effect::HttpGet(
                        crate::ApiSpec::get("https://example.com/data").request(),
                    ))
                }
                Step::Resume(Resumption::Api(Ok(response))) => Progress::Submit(TxPayload::new(
                    ctx.sender,
                    TestRound::Collect,
                    vec![FieldValue::Int(response.status as i64)],
                )),
                Step::Resume(_) => Progress::Ceded,
            }
        }
    }

    fn ctx(db: &SynchronizedData<TestRound>) -> BehaviourContext<'_, TestRound> {
        BehaviourContext {
            sender: ParticipantId(0),
            db,
            now: Duration::ZERO,
        }
    }

    fn make_set() -> (BehaviourSet<TestRound>, Arc<AtomicU32>) {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut set = BehaviourSet::new();
        set.register(Box::new(FetchOnce {
            attempts: Arc::clone(&attempts),
        }));
        (set, attempts)
    }

    #[test]
    fn test_start_suspends_on_io() {
        let db = SynchronizedData::new();
        let (mut set, _) = make_set();

        let progress = set.enter_round(TestRound::Collect, &ctx(&db)).unwrap();
        assert!(matches!(progress, Progress::Await(Effect::HttpGet(_))));
        assert_eq!(
            set.state(),
            SchedulerState::AwaitingIo {
                round: TestRound::Collect
            }
        );
    }

    #[test]
    fn test_resume_submits_and_awaits_round_end() {
        let db = SynchronizedData::new();
        let (mut set, _) = make_set();
        set.enter_round(TestRound::Collect, &ctx(&db)).unwrap();

        let progress = set
            .resume(
                Resumption::Api(Ok(ApiResponse {
                    status: 200,
                    body: vec![],
                })),
                &ctx(&db),
            )
            .unwrap();

        assert!(matches!(progress, Progress::Submit(_)));
        assert_eq!(
            set.state(),
            SchedulerState::AwaitingRoundEnd {
                round: TestRound::Collect
            }
        );

        // A resumption while awaiting round end is stale and dropped.
        assert!(set
            .resume(Resumption::Api(Err(IoError::Timeout)), &ctx(&db))
            .is_none());
    }

    #[test]
    fn test_no_behaviour_for_final_round() {
        let db = SynchronizedData::new();
        let (mut set, _) = make_set();

        assert!(set.enter_round(TestRound::Finished, &ctx(&db)).is_none());
        assert_eq!(set.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_reentry_restarts_from_start() {
        let db = SynchronizedData::new();
        let (mut set, attempts) = make_set();

        set.enter_round(TestRound::Collect, &ctx(&db)).unwrap();
        set.enter_round(TestRound::Collect, &ctx(&db)).unwrap();

        // Two entries mean two Start steps: local work repeats, which is
        // the documented at-least-once contract.
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
        assert_eq!(
            set.state(),
            SchedulerState::AwaitingIo {
                round: TestRound::Collect
            }
        );
    }
}
