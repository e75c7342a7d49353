//! The round-transition engine.

use crate::{
    AbciAppSpec, AppError, CollectSameUntilThresholdRound, DegenerateRound, RoundModel,
    SynchronizedData,
};
use roundtable_types::{Committee, Event, RoundKind, TxPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The outcome of one resolved round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<K> {
    /// The round that resolved.
    pub round: K,
    /// The event it resolved with.
    pub event: Event,
    /// The round the application entered next.
    pub next: K,
}

/// The active round instance.
enum CurrentRound<K> {
    Collect(CollectSameUntilThresholdRound<K>),
    Degenerate(DegenerateRound<K>),
}

/// The application-level finite state machine.
///
/// Owns the synchronized data store and the single active round instance.
/// Advances exactly once per resolved round: a round emits its event, the
/// transition table selects the successor, and a fresh round instance is
/// created for it. Collected payloads of a left-behind round persist only
/// through what its resolution wrote into synchronized data.
pub struct AbciApp<K> {
    spec: AbciAppSpec<K>,
    committee: Arc<dyn Committee>,
    db: SynchronizedData<K>,
    current: CurrentRound<K>,
    current_kind: K,
    terminated: bool,
    /// Selection arity is validated against the first payload seen for
    /// each entered round kind.
    arity_checked: bool,
}

impl<K: std::fmt::Debug> std::fmt::Debug for AbciApp<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbciApp")
            .field("current_kind", &self.current_kind)
            .field("terminated", &self.terminated)
            .field("arity_checked", &self.arity_checked)
            .finish_non_exhaustive()
    }
}

impl<K: RoundKind> AbciApp<K> {
    /// Create an app positioned at the spec's initial round.
    ///
    /// The initial round's pre-conditions are checked against the empty
    /// store, so an initial round requiring keys fails here, before
    /// anything runs.
    pub fn new(spec: AbciAppSpec<K>, committee: Arc<dyn Committee>) -> Result<Self, AppError<K>> {
        let initial = spec.initial_round();
        let mut app = Self {
            spec,
            committee,
            db: SynchronizedData::new(),
            // Placeholder until `enter` below; the initial round is always
            // registered because the spec validated.
            current: CurrentRound::Degenerate(DegenerateRound::new(initial)),
            current_kind: initial,
            terminated: false,
            arity_checked: false,
        };
        app.enter(initial)?;
        Ok(app)
    }

    /// Get the active round kind.
    pub fn current_round(&self) -> K {
        self.current_kind
    }

    /// Check if the run has terminated in a final state.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Get the synchronized data store.
    pub fn db(&self) -> &SynchronizedData<K> {
        &self.db
    }

    /// Get the number of payloads the active round has collected.
    pub fn current_collection_size(&self) -> usize {
        match &self.current {
            CurrentRound::Collect(round) => round.collection_size(),
            CurrentRound::Degenerate(_) => 0,
        }
    }

    /// Get the configured time budget for rounds, if any.
    pub fn round_timeout(&self) -> Option<Duration> {
        self.spec.timeout_for(Event::RoundTimeout)
    }

    /// Submit a payload to the active round.
    pub fn submit(&mut self, payload: TxPayload<K>) -> Result<(), AppError<K>> {
        if self.terminated {
            return Err(AppError::Terminated(self.current_kind));
        }

        match &mut self.current {
            CurrentRound::Collect(round) => {
                if !self.arity_checked && payload.round() == round.kind() {
                    round.check_selection_arity(&payload)?;
                    self.arity_checked = true;
                }
                round.submit(payload)?;
                Ok(())
            }
            CurrentRound::Degenerate(round) => {
                round.submit(&payload)?;
                Ok(())
            }
        }
    }

    /// Evaluate the active round at a block boundary.
    ///
    /// If the round concludes, applies its event and returns the
    /// resolution; returns `None` while the round is still collecting.
    pub fn end_block(&mut self) -> Result<Option<Resolution<K>>, AppError<K>> {
        if self.terminated {
            return Ok(None);
        }

        let event = match &mut self.current {
            CurrentRound::Collect(round) => round.end_block(&mut self.db)?,
            CurrentRound::Degenerate(_) => None,
        };

        match event {
            Some(event) => {
                // Post-conditions assert what the round's writes guarantee;
                // they are only checkable when the round resolved with
                // agreement and actually wrote.
                if self.is_done_event(event) {
                    self.check_post_conditions()?;
                }
                self.process_event(event).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Check if an event is the current round's agreement event.
    fn is_done_event(&self, event: Event) -> bool {
        match self.spec.round(self.current_kind).map(|def| &def.model) {
            Some(RoundModel::CollectSameUntilThreshold { done_event, .. }) => event == *done_event,
            _ => false,
        }
    }

    /// Expire the active round because its time budget elapsed.
    ///
    /// Discards every payload the round had accumulated and applies
    /// `Event::RoundTimeout`. This is an expected operational condition,
    /// not an error.
    pub fn expire_round(&mut self) -> Result<Resolution<K>, AppError<K>> {
        if self.terminated {
            return Err(AppError::Terminated(self.current_kind));
        }

        warn!(
            round = %self.current_kind,
            collected = self.current_collection_size(),
            "Round timed out, discarding collected payloads"
        );

        self.process_event(Event::RoundTimeout)
    }

    /// Apply an event to the current round kind.
    ///
    /// Pure with respect to the transition choice: the successor depends
    /// only on `(current round kind, event)`. The lookup cannot fail for
    /// events the spec validated; a miss is surfaced as a hard error
    /// rather than a panic.
    pub fn process_event(&mut self, event: Event) -> Result<Resolution<K>, AppError<K>> {
        let round = self.current_kind;
        let next = self
            .spec
            .transitions()
            .next(round, event)
            .ok_or(AppError::MissingTransition { round, event })?;

        info!(%round, %event, %next, "Round resolved");

        self.enter(next)?;
        Ok(Resolution { round, event, next })
    }

    /// Instantiate and enter a round.
    fn enter(&mut self, kind: K) -> Result<(), AppError<K>> {
        // The spec validated every transition endpoint, so the definition
        // is always present.
        let def = self
            .spec
            .round(kind)
            .ok_or(AppError::Spec(crate::SpecError::UnknownRound(kind)))?
            .clone();

        for key in &def.pre_conditions {
            if !self.db.contains(key) {
                return Err(AppError::InvariantBroken {
                    round: kind,
                    key: key.to_string(),
                });
            }
        }

        self.current = match def.model {
            RoundModel::CollectSameUntilThreshold {
                done_event,
                no_majority_event,
                collection_key,
                selection_keys,
            } => CurrentRound::Collect(CollectSameUntilThresholdRound::new(
                kind,
                Arc::clone(&self.committee),
                done_event,
                no_majority_event,
                collection_key,
                selection_keys,
            )),
            RoundModel::Degenerate => CurrentRound::Degenerate(DegenerateRound::new(kind)),
        };
        self.current_kind = kind;
        self.arity_checked = false;

        if self.spec.is_final(kind) {
            info!(round = %kind, "Entered final state, run terminated");
            self.terminated = true;
        } else {
            debug!(round = %kind, "Entered round");
        }

        Ok(())
    }

    /// Verify the resolving round's post-conditions.
    fn check_post_conditions(&self) -> Result<(), AppError<K>> {
        let def = match self.spec.round(self.current_kind) {
            Some(def) => def,
            None => return Ok(()),
        };
        for key in &def.post_conditions {
            if !self.db.contains(key) {
                return Err(AppError::InvariantBroken {
                    round: self.current_kind,
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RoundDef, RoundError};
    use roundtable_test_helpers::{test_committee, TestRound};
    use roundtable_types::{FieldValue, ParticipantId};
    use tracing_test::traced_test;

    fn test_spec() -> AbciAppSpec<TestRound> {
        AbciAppSpec::builder(TestRound::Collect)
            .round(
                RoundDef::collect(
                    TestRound::Collect,
                    Event::Done,
                    Event::NoMajority,
                    "participant_to_collect",
                    &["value"],
                )
                .with_post_conditions(&["value"]),
            )
            .round(RoundDef::degenerate(TestRound::Finished))
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
            .build()
            .unwrap()
    }

    fn make_app() -> AbciApp<TestRound> {
        AbciApp::new(test_spec(), test_committee(4, 0)).unwrap()
    }

    fn payload(sender: u64, value: i64) -> TxPayload<TestRound> {
        TxPayload::new(
            ParticipantId(sender),
            TestRound::Collect,
            vec![FieldValue::Int(value)],
        )
    }

    #[traced_test]
    #[test]
    fn test_scenario_a_threshold_agreement() {
        let mut app = make_app();

        // P1, P2, P3 submit V1; P4 submits V2
        app.submit(payload(0, 1)).unwrap();
        app.submit(payload(1, 1)).unwrap();
        app.submit(payload(2, 1)).unwrap();
        app.submit(payload(3, 2)).unwrap();

        let resolution = app.end_block().unwrap().unwrap();
        assert_eq!(
            resolution,
            Resolution {
                round: TestRound::Collect,
                event: Event::Done,
                next: TestRound::Finished,
            }
        );

        assert_eq!(app.db().get_scalar("value").unwrap(), &FieldValue::Int(1));
        assert!(app.is_terminated());
    }

    #[traced_test]
    #[test]
    fn test_scenario_b_no_majority_self_loop() {
        let mut app = make_app();

        // 2/1/1 split among three distinct values
        app.submit(payload(0, 1)).unwrap();
        app.submit(payload(1, 1)).unwrap();
        app.submit(payload(2, 2)).unwrap();
        app.submit(payload(3, 3)).unwrap();

        let resolution = app.end_block().unwrap().unwrap();
        assert_eq!(resolution.event, Event::NoMajority);
        assert_eq!(resolution.next, TestRound::Collect);

        // Synchronized data untouched, fresh round instance
        assert!(!app.db().contains("value"));
        assert_eq!(app.db().version(), 0);
        assert_eq!(app.current_collection_size(), 0);
        assert!(!app.is_terminated());

        // The same participants may submit again to the fresh instance
        app.submit(payload(0, 5)).unwrap();
        assert_eq!(app.current_collection_size(), 1);
    }

    #[traced_test]
    #[test]
    fn test_scenario_c_round_timeout_self_loop() {
        let mut app = make_app();

        app.submit(payload(0, 1)).unwrap();
        assert_eq!(app.end_block().unwrap(), None);

        let resolution = app.expire_round().unwrap();
        assert_eq!(resolution.event, Event::RoundTimeout);
        assert_eq!(resolution.next, TestRound::Collect);

        // Accumulated payloads were discarded
        assert_eq!(app.current_collection_size(), 0);
        assert_eq!(app.db().version(), 0);
    }

    #[test]
    fn test_scenario_d_terminated_app_rejects_submissions() {
        let mut app = make_app();
        for (sender, value) in [(0, 1), (1, 1), (2, 1)] {
            app.submit(payload(sender, value)).unwrap();
        }
        app.end_block().unwrap().unwrap();
        assert!(app.is_terminated());

        assert_eq!(
            app.submit(payload(3, 1)).unwrap_err(),
            AppError::Terminated(TestRound::Finished)
        );

        // end_block on a terminated app is a no-op
        assert_eq!(app.end_block().unwrap(), None);
    }

    #[test]
    fn test_process_event_is_deterministic() {
        let spec = test_spec();
        let app_a = AbciApp::new(spec.clone(), test_committee(4, 0)).unwrap();
        let app_b = AbciApp::new(spec, test_committee(4, 1)).unwrap();

        for event in [Event::Done, Event::NoMajority, Event::RoundTimeout] {
            assert_eq!(
                app_a.spec.transitions().next(app_a.current_round(), event),
                app_b.spec.transitions().next(app_b.current_round(), event),
            );
        }
    }

    #[test]
    fn test_initial_pre_condition_violation_is_fatal() {
        let spec = AbciAppSpec::builder(TestRound::Collect)
            .round(
                RoundDef::collect(
                    TestRound::Collect,
                    Event::Done,
                    Event::NoMajority,
                    "participant_to_collect",
                    &["value"],
                )
                // Nothing can have written this before the run starts.
                .with_pre_conditions(&["bootstrap"]),
            )
            .round(RoundDef::degenerate(TestRound::Finished))
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
            .build()
            .unwrap();

        let err = AbciApp::new(spec, test_committee(4, 0)).unwrap_err();
        assert_eq!(
            err,
            AppError::InvariantBroken {
                round: TestRound::Collect,
                key: "bootstrap".to_string(),
            }
        );
    }

    #[test]
    fn test_selection_arity_checked_on_first_submission() {
        let mut app = make_app();

        let wide = TxPayload::new(
            ParticipantId(0),
            TestRound::Collect,
            vec![FieldValue::Int(1), FieldValue::Int(2)],
        );
        let err = app.submit(wide).unwrap_err();
        assert!(matches!(err, AppError::Spec(_)));
    }

    #[test]
    fn test_duplicate_submission_surfaces_protocol_error() {
        let mut app = make_app();
        app.submit(payload(1, 7)).unwrap();

        let err = app.submit(payload(1, 7)).unwrap_err();
        assert_eq!(
            err,
            AppError::Round(RoundError::DuplicateSubmission {
                round: TestRound::Collect,
                sender: ParticipantId(1),
            })
        );
    }
}
