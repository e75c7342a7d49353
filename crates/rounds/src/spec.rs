//! Static application definition and assembly-time validation.

use crate::SpecError;
use indexmap::IndexMap;
use roundtable_types::{Event, RoundKind};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

/// How a round kind behaves while it is the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundModel {
    /// Collect one payload per participant until a threshold of identical
    /// value tuples exists.
    CollectSameUntilThreshold {
        /// Event emitted on threshold agreement.
        done_event: Event,
        /// Event emitted when the threshold is out of reach.
        no_majority_event: Event,
        /// Synchronized data key for the participant-to-payload mapping.
        collection_key: &'static str,
        /// Synchronized data keys for the agreed fields, in payload field
        /// order.
        selection_keys: &'static [&'static str],
    },

    /// Terminal round; accepts no submissions and emits no events.
    Degenerate,
}

impl RoundModel {
    /// The events a round of this model can emit.
    ///
    /// `RoundTimeout` is produced by the engine for every non-terminal
    /// round, so it is always part of the emittable set.
    pub fn emittable_events(&self) -> Vec<Event> {
        match self {
            RoundModel::CollectSameUntilThreshold {
                done_event,
                no_majority_event,
                ..
            } => vec![*done_event, *no_majority_event, Event::RoundTimeout],
            RoundModel::Degenerate => vec![],
        }
    }

    /// The synchronized data keys a round of this model writes when it
    /// resolves with its done event.
    pub fn written_keys(&self) -> Vec<&'static str> {
        match self {
            RoundModel::CollectSameUntilThreshold {
                collection_key,
                selection_keys,
                ..
            } => {
                let mut keys = selection_keys.to_vec();
                keys.push(collection_key);
                keys
            }
            RoundModel::Degenerate => vec![],
        }
    }
}

/// One round kind's definition inside an application.
#[derive(Debug, Clone)]
pub struct RoundDef<K> {
    /// The round kind tag.
    pub kind: K,

    /// The round's behaviour model.
    pub model: RoundModel,

    /// Synchronized data keys that must be present when this round is
    /// entered.
    pub pre_conditions: BTreeSet<&'static str>,

    /// Synchronized data keys that must be present when this round
    /// resolves with agreement.
    pub post_conditions: BTreeSet<&'static str>,
}

impl<K: RoundKind> RoundDef<K> {
    /// Define a collect-same-until-threshold round.
    pub fn collect(
        kind: K,
        done_event: Event,
        no_majority_event: Event,
        collection_key: &'static str,
        selection_keys: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            model: RoundModel::CollectSameUntilThreshold {
                done_event,
                no_majority_event,
                collection_key,
                selection_keys,
            },
            pre_conditions: BTreeSet::new(),
            post_conditions: BTreeSet::new(),
        }
    }

    /// Define a degenerate (terminal) round.
    pub fn degenerate(kind: K) -> Self {
        Self {
            kind,
            model: RoundModel::Degenerate,
            pre_conditions: BTreeSet::new(),
            post_conditions: BTreeSet::new(),
        }
    }

    /// Add required-present keys on entry.
    pub fn with_pre_conditions(mut self, keys: &[&'static str]) -> Self {
        self.pre_conditions.extend(keys.iter().copied());
        self
    }

    /// Add required-present keys on resolution.
    pub fn with_post_conditions(mut self, keys: &[&'static str]) -> Self {
        self.post_conditions.extend(keys.iter().copied());
        self
    }
}

/// The transition function: `(round kind, event) -> next round kind`.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable<K> {
    edges: BTreeMap<(K, Event), K>,
}

impl<K: RoundKind> TransitionTable<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }

    /// Add a transition.
    pub fn insert(&mut self, from: K, event: Event, to: K) {
        self.edges.insert((from, event), to);
    }

    /// Look up the next round for an event.
    pub fn next(&self, from: K, event: Event) -> Option<K> {
        self.edges.get(&(from, event)).copied()
    }

    /// Iterate all edges.
    pub fn iter(&self) -> impl Iterator<Item = (K, Event, K)> + '_ {
        self.edges.iter().map(|((from, ev), to)| (*from, *ev, *to))
    }

    /// Check if a round has any outgoing transitions.
    pub fn has_outgoing(&self, from: K) -> bool {
        self.edges.keys().any(|(f, _)| *f == from)
    }
}

/// The static definition of an application.
///
/// Validated once at assembly time; after that, transition lookups cannot
/// fail and the round graph is known to be well formed.
#[derive(Debug, Clone)]
pub struct AbciAppSpec<K> {
    initial_round: K,
    rounds: IndexMap<K, RoundDef<K>>,
    transitions: TransitionTable<K>,
    final_states: BTreeSet<K>,
    event_to_timeout: BTreeMap<Event, Duration>,
}

impl<K: RoundKind> AbciAppSpec<K> {
    /// Start building a spec.
    pub fn builder(initial_round: K) -> AbciAppSpecBuilder<K> {
        AbciAppSpecBuilder {
            initial_round,
            rounds: IndexMap::new(),
            transitions: TransitionTable::new(),
            final_states: BTreeSet::new(),
            event_to_timeout: BTreeMap::new(),
        }
    }

    /// Get the initial round kind.
    pub fn initial_round(&self) -> K {
        self.initial_round
    }

    /// Get a round definition.
    pub fn round(&self, kind: K) -> Option<&RoundDef<K>> {
        self.rounds.get(&kind)
    }

    /// Get the transition table.
    pub fn transitions(&self) -> &TransitionTable<K> {
        &self.transitions
    }

    /// Check if a round kind is a final state.
    pub fn is_final(&self, kind: K) -> bool {
        self.final_states.contains(&kind)
    }

    /// Get the timeout configured for an event, if any.
    pub fn timeout_for(&self, event: Event) -> Option<Duration> {
        self.event_to_timeout.get(&event).copied()
    }
}

/// Builder for [`AbciAppSpec`].
pub struct AbciAppSpecBuilder<K> {
    initial_round: K,
    rounds: IndexMap<K, RoundDef<K>>,
    transitions: TransitionTable<K>,
    final_states: BTreeSet<K>,
    event_to_timeout: BTreeMap<Event, Duration>,
}

impl<K: RoundKind> AbciAppSpecBuilder<K> {
    /// Register a round definition.
    pub fn round(mut self, def: RoundDef<K>) -> Self {
        self.rounds.insert(def.kind, def);
        self
    }

    /// Add a transition edge.
    pub fn transition(mut self, from: K, event: Event, to: K) -> Self {
        self.transitions.insert(from, event, to);
        self
    }

    /// Declare a final state.
    pub fn final_state(mut self, kind: K) -> Self {
        self.final_states.insert(kind);
        self
    }

    /// Configure the timeout for an event.
    pub fn timeout(mut self, event: Event, duration: Duration) -> Self {
        self.event_to_timeout.insert(event, duration);
        self
    }

    /// Validate and build the spec.
    ///
    /// Every construction error the engine can detect statically is
    /// reported here, before any round executes.
    pub fn build(self) -> Result<AbciAppSpec<K>, SpecError<K>> {
        let Self {
            initial_round,
            rounds,
            transitions,
            final_states,
            event_to_timeout,
        } = self;

        // The initial round must exist.
        if !rounds.contains_key(&initial_round) {
            return Err(SpecError::MissingInitialRound(initial_round));
        }

        // Every transition endpoint must be registered.
        for (from, _, to) in transitions.iter() {
            if !rounds.contains_key(&from) {
                return Err(SpecError::UnknownRound(from));
            }
            if !rounds.contains_key(&to) {
                return Err(SpecError::UnknownRound(to));
            }
        }

        // Final states must be degenerate rounds without outgoing edges,
        // and degenerate rounds must be final.
        for kind in &final_states {
            match rounds.get(kind) {
                None => return Err(SpecError::UnknownRound(*kind)),
                Some(def) if def.model != RoundModel::Degenerate => {
                    return Err(SpecError::FinalStateNotDegenerate(*kind))
                }
                Some(_) => {}
            }
            if transitions.has_outgoing(*kind) {
                return Err(SpecError::FinalStateHasTransitions(*kind));
            }
        }
        for def in rounds.values() {
            if def.model == RoundModel::Degenerate && !final_states.contains(&def.kind) {
                return Err(SpecError::DegenerateRoundNotFinal(def.kind));
            }
        }

        // Every event a round can emit must be mapped.
        for def in rounds.values() {
            for event in def.model.emittable_events() {
                if transitions.next(def.kind, event).is_none() {
                    return Err(SpecError::MissingTransition {
                        round: def.kind,
                        event,
                    });
                }
            }
        }

        // Every registered round must be reachable from the initial round.
        let mut reachable = BTreeSet::new();
        let mut queue = VecDeque::from([initial_round]);
        while let Some(kind) = queue.pop_front() {
            if !reachable.insert(kind) {
                continue;
            }
            for (from, _, to) in transitions.iter() {
                if from == kind && !reachable.contains(&to) {
                    queue.push_back(to);
                }
            }
        }
        for kind in rounds.keys() {
            if !reachable.contains(kind) {
                return Err(SpecError::UnreachableRound(*kind));
            }
        }

        // Pre/post-condition consistency: along each edge, the destination's
        // pre-conditions must be guaranteed by what held on entry to the
        // source plus what the source wrote (it writes only when the edge is
        // its done event).
        for (from, event, to) in transitions.iter() {
            let from_def = &rounds[&from];
            let to_def = &rounds[&to];

            let done_edge = matches!(
                &from_def.model,
                RoundModel::CollectSameUntilThreshold { done_event, .. } if *done_event == event
            );

            for key in to_def.pre_conditions.iter().copied() {
                let guaranteed = from_def.pre_conditions.contains(key)
                    || (done_edge && from_def.model.written_keys().contains(&key));
                if !guaranteed {
                    return Err(SpecError::InconsistentConditions {
                        from,
                        to,
                        missing_key: key,
                    });
                }
            }
        }

        Ok(AbciAppSpec {
            initial_round,
            rounds,
            transitions,
            final_states,
            event_to_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_test_helpers::TestRound;

    fn collect_def() -> RoundDef<TestRound> {
        RoundDef::collect(
            TestRound::Collect,
            Event::Done,
            Event::NoMajority,
            "participant_to_collect",
            &["value"],
        )
    }

    fn valid_builder() -> AbciAppSpecBuilder<TestRound> {
        AbciAppSpec::builder(TestRound::Collect)
            .round(collect_def())
            .round(RoundDef::degenerate(TestRound::Finished))
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
    }

    #[test]
    fn test_valid_spec_builds() {
        let spec = valid_builder().build().unwrap();
        assert_eq!(spec.initial_round(), TestRound::Collect);
        assert!(spec.is_final(TestRound::Finished));
        assert_eq!(
            spec.transitions().next(TestRound::Collect, Event::Done),
            Some(TestRound::Finished)
        );
    }

    #[test]
    fn test_missing_transition_is_detected() {
        let err = AbciAppSpec::builder(TestRound::Collect)
            .round(collect_def())
            .round(RoundDef::degenerate(TestRound::Finished))
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            // RoundTimeout left unmapped
            .final_state(TestRound::Finished)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SpecError::MissingTransition {
                round: TestRound::Collect,
                event: Event::RoundTimeout,
            }
        );
    }

    #[test]
    fn test_missing_initial_round() {
        let err = AbciAppSpec::<TestRound>::builder(TestRound::Other)
            .round(collect_def())
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::MissingInitialRound(TestRound::Other));
    }

    #[test]
    fn test_final_state_must_be_degenerate() {
        let err = AbciAppSpec::builder(TestRound::Collect)
            .round(collect_def())
            .transition(TestRound::Collect, Event::Done, TestRound::Collect)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Collect)
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::FinalStateNotDegenerate(TestRound::Collect));
    }

    #[test]
    fn test_final_state_cannot_have_outgoing_edges() {
        let err = valid_builder()
            .transition(TestRound::Finished, Event::Done, TestRound::Collect)
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::FinalStateHasTransitions(TestRound::Finished));
    }

    #[test]
    fn test_unreachable_round_is_detected() {
        let err = valid_builder()
            .round(RoundDef::collect(
                TestRound::Other,
                Event::Done,
                Event::NoMajority,
                "participant_to_other",
                &["other"],
            ))
            .transition(TestRound::Other, Event::Done, TestRound::Finished)
            .transition(TestRound::Other, Event::NoMajority, TestRound::Other)
            .transition(TestRound::Other, Event::RoundTimeout, TestRound::Other)
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::UnreachableRound(TestRound::Other));
    }

    #[test]
    fn test_inconsistent_pre_conditions_detected() {
        let err = AbciAppSpec::builder(TestRound::Collect)
            .round(collect_def())
            .round(
                RoundDef::degenerate(TestRound::Finished)
                    // Nothing on the Done edge writes this key.
                    .with_pre_conditions(&["never_written"]),
            )
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            SpecError::InconsistentConditions {
                from: TestRound::Collect,
                to: TestRound::Finished,
                missing_key: "never_written",
            }
        );
    }

    #[test]
    fn test_pre_conditions_satisfied_by_writes() {
        let spec = AbciAppSpec::builder(TestRound::Collect)
            .round(collect_def())
            .round(
                RoundDef::degenerate(TestRound::Finished).with_pre_conditions(&["value"]),
            )
            .transition(TestRound::Collect, Event::Done, TestRound::Finished)
            .transition(TestRound::Collect, Event::NoMajority, TestRound::Collect)
            .transition(TestRound::Collect, Event::RoundTimeout, TestRound::Collect)
            .final_state(TestRound::Finished)
            .build();

        assert!(spec.is_ok());
    }
}
