//! Round instances that collect payloads toward one agreed decision.

use crate::{RoundError, SpecError, SyncDataError, SyncValue, SynchronizedData};
use roundtable_types::{Committee, Event, FieldValue, ParticipantId, RoundKind, TxPayload};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A round that concludes once a threshold of participants submitted the
/// same value tuple.
///
/// One payload is accepted per participant. `end_block` inspects the
/// multiset of value tuples: reaching the committee threshold resolves the
/// round with its done event and writes the agreed fields into synchronized
/// data; an unreachable majority resolves it with its no-majority event and
/// writes nothing.
///
/// Unlike an async implementation there is no interior locking: the round
/// is owned by the application and mutated from a single thread.
#[derive(Clone)]
pub struct CollectSameUntilThresholdRound<K> {
    /// Round kind tag; submitted payloads must carry the same tag.
    kind: K,

    /// Committee membership and threshold math.
    committee: Arc<dyn Committee>,

    /// Event emitted when threshold agreement is reached.
    done_event: Event,

    /// Event emitted when no value can reach the threshold any more.
    no_majority_event: Event,

    /// Synchronized data key the participant-to-payload mapping is stored
    /// under on success.
    collection_key: &'static str,

    /// Synchronized data keys the winning payload's fields are stored
    /// under, in payload field order.
    selection_keys: &'static [&'static str],

    /// Collected payloads, ordered by participant.
    collection: BTreeMap<ParticipantId, TxPayload<K>>,

    /// Set once the round has emitted its event; a resolved round is
    /// immutable.
    resolved: bool,
}

impl<K: RoundKind> CollectSameUntilThresholdRound<K> {
    /// Create a new collection round.
    pub fn new(
        kind: K,
        committee: Arc<dyn Committee>,
        done_event: Event,
        no_majority_event: Event,
        collection_key: &'static str,
        selection_keys: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            committee,
            done_event,
            no_majority_event,
            collection_key,
            selection_keys,
            collection: BTreeMap::new(),
            resolved: false,
        }
    }

    /// Get the round kind.
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Get the number of payloads collected so far.
    pub fn collection_size(&self) -> usize {
        self.collection.len()
    }

    /// Check if the round has resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Accept a payload from a participant.
    ///
    /// Rejects submissions to a resolved round, payloads addressed to a
    /// different round kind, senders outside the committee and duplicate
    /// submissions; rejected submissions leave the collection unchanged.
    pub fn submit(&mut self, payload: TxPayload<K>) -> Result<(), RoundError<K>> {
        if self.resolved {
            return Err(RoundError::RoundResolved { round: self.kind });
        }

        if payload.round() != self.kind {
            return Err(RoundError::WrongPayloadKind {
                round: self.kind,
                got: payload.round(),
            });
        }

        let sender = payload.sender();
        if !self.committee.contains(sender) {
            return Err(RoundError::UnknownParticipant {
                round: self.kind,
                sender,
            });
        }

        if self.collection.contains_key(&sender) {
            return Err(RoundError::DuplicateSubmission {
                round: self.kind,
                sender,
            });
        }

        debug!(
            round = %self.kind,
            %sender,
            collected = self.collection.len() + 1,
            committee = self.committee.size(),
            "Payload collected"
        );

        self.collection.insert(sender, payload);
        Ok(())
    }

    /// Find the leading value tuple.
    ///
    /// Returns `(values, count)` for the most-submitted tuple. Ties are
    /// broken toward the tuple whose lowest-ordered submitter is smallest;
    /// both the collection and the tally iterate in participant order, so
    /// every node picks the same leader regardless of arrival order.
    fn leading_value(&self) -> Option<(&TxPayload<K>, usize)> {
        let mut tally: BTreeMap<&[FieldValue], (usize, ParticipantId)> = BTreeMap::new();

        for (sender, payload) in &self.collection {
            let entry = tally
                .entry(payload.values())
                .or_insert((0, *sender));
            entry.0 += 1;
        }

        let mut winner: Option<(&[FieldValue], usize, ParticipantId)> = None;
        for (values, (count, first_sender)) in tally {
            let better = match winner {
                None => true,
                Some((_, best_count, best_sender)) => {
                    count > best_count || (count == best_count && first_sender < best_sender)
                }
            };
            if better {
                winner = Some((values, count, first_sender));
            }
        }

        winner.map(|(_, count, first_sender)| (&self.collection[&first_sender], count))
    }

    /// Evaluate the round at a block boundary.
    ///
    /// Returns the round's event once it can conclude, `None` while it is
    /// still collecting. Exactly one event is returned over the lifetime of
    /// the instance; after that the round is immutable and further
    /// evaluations return `None`.
    pub fn end_block(
        &mut self,
        db: &mut SynchronizedData<K>,
    ) -> Result<Option<Event>, SyncDataError> {
        if self.resolved {
            return Ok(None);
        }

        let total = self.committee.size();
        let threshold = self.committee.threshold();
        let submitted = self.collection.len();

        let Some((winning, count)) = self.leading_value() else {
            // Nothing collected yet.
            return Ok(None);
        };

        if count >= threshold {
            let winning = winning.clone();
            info!(
                round = %self.kind,
                count,
                threshold,
                "Threshold agreement reached"
            );

            for (key, value) in self.selection_keys.iter().zip(winning.values()) {
                db.insert_new(key, SyncValue::Scalar(value.clone()))?;
            }
            db.insert_new(
                self.collection_key,
                SyncValue::Collection(self.collection.clone()),
            )?;
            let version = db.commit();

            debug!(round = %self.kind, version, "Agreed fields committed");

            self.resolved = true;
            return Ok(Some(self.done_event));
        }

        // Unreachable majority: even if every outstanding participant voted
        // for the current leader, the threshold cannot be met.
        let outstanding = total - submitted;
        if count + outstanding < threshold {
            warn!(
                round = %self.kind,
                leader_count = count,
                outstanding,
                threshold,
                "No value can reach threshold"
            );
            self.resolved = true;
            return Ok(Some(self.no_majority_event));
        }

        Ok(None)
    }

    /// Validate the selection arity against an observed payload.
    ///
    /// The engine cannot know payload field counts statically, so the first
    /// submission of an application's lifetime is checked against the
    /// round's selection keys.
    pub fn check_selection_arity(&self, payload: &TxPayload<K>) -> Result<(), SpecError<K>> {
        if payload.values().len() != self.selection_keys.len() {
            return Err(SpecError::SelectionArityMismatch {
                round: self.kind,
                selection: self.selection_keys.len(),
                fields: payload.values().len(),
            });
        }
        Ok(())
    }
}

/// A terminal round.
///
/// Entering one ends the run: it accepts no submissions and never emits an
/// event.
#[derive(Debug, Clone, Copy)]
pub struct DegenerateRound<K> {
    kind: K,
}

impl<K: RoundKind> DegenerateRound<K> {
    /// Create a new degenerate round.
    pub fn new(kind: K) -> Self {
        Self { kind }
    }

    /// Get the round kind.
    pub fn kind(&self) -> K {
        self.kind
    }

    /// Reject a submission.
    pub fn submit(&self, payload: &TxPayload<K>) -> Result<(), RoundError<K>> {
        let _ = payload;
        Err(RoundError::RoundResolved { round: self.kind })
    }
}
