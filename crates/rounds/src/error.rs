//! Error types for the round engine.

use roundtable_types::{Event, ParticipantId};
use std::fmt;
use thiserror::Error;

/// Protocol errors raised by a round instance.
///
/// These are always fatal to the offending submission and are surfaced to
/// the operator; they are never silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError<K: fmt::Display + fmt::Debug> {
    /// The sender already submitted a payload for this round.
    #[error("duplicate submission from {sender} in round {round}")]
    DuplicateSubmission {
        /// The round the submission was addressed to.
        round: K,
        /// The offending sender.
        sender: ParticipantId,
    },

    /// The payload is addressed to a different round kind.
    #[error("round {round} got payload for {got}")]
    WrongPayloadKind {
        /// The round that received the payload.
        round: K,
        /// The round kind the payload was built for.
        got: K,
    },

    /// The sender is not a committee member.
    #[error("round {round} got payload from non-member {sender}")]
    UnknownParticipant {
        /// The round that received the payload.
        round: K,
        /// The offending sender.
        sender: ParticipantId,
    },

    /// The round has already resolved (or is a terminal round) and accepts
    /// no further submissions.
    #[error("round {round} is resolved and accepts no submissions")]
    RoundResolved {
        /// The resolved round.
        round: K,
    },
}

/// Errors raised by the synchronized data store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncDataError {
    /// Read of a key that was never written.
    ///
    /// Distinguished from a key holding an empty collection: that read
    /// succeeds and returns the empty collection.
    #[error("synchronized data has no key '{0}'")]
    MissingKey(String),

    /// Write to a key that already holds a value.
    ///
    /// Keys are written once, by the resolution of the round that owns
    /// them; a second write indicates a round graph bug.
    #[error("synchronized data key '{0}' is already set")]
    KeyAlreadySet(String),

    /// The key holds a value of the other shape.
    #[error("synchronized data key '{key}' is not a {expected}")]
    WrongShape {
        /// The key that was read.
        key: String,
        /// `"scalar"` or `"collection"`.
        expected: &'static str,
    },
}

/// Construction errors detected by static validation of an application
/// specification, before any round executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError<K: fmt::Display + fmt::Debug> {
    /// The initial round is not registered.
    #[error("initial round {0} is not registered")]
    MissingInitialRound(K),

    /// A transition references an unregistered round.
    #[error("transition references unregistered round {0}")]
    UnknownRound(K),

    /// A round can emit an event with no transition mapped for it.
    #[error("round {round} has no transition for event {event}")]
    MissingTransition {
        /// The round missing a mapping.
        round: K,
        /// The unmapped event.
        event: Event,
    },

    /// A declared final state is not a degenerate round.
    #[error("final state {0} is not a degenerate round")]
    FinalStateNotDegenerate(K),

    /// A degenerate round is not declared final.
    #[error("degenerate round {0} is not a final state")]
    DegenerateRoundNotFinal(K),

    /// A final state has outgoing transitions.
    #[error("final state {0} has outgoing transitions")]
    FinalStateHasTransitions(K),

    /// A registered round can never be entered from the initial round.
    #[error("round {0} is unreachable from the initial round")]
    UnreachableRound(K),

    /// A round's pre-conditions cannot be guaranteed by its predecessors.
    #[error("transition {from} -> {to} cannot guarantee key '{missing_key}'")]
    InconsistentConditions {
        /// Source round of the offending edge.
        from: K,
        /// Destination round whose pre-condition is unmet.
        to: K,
        /// The key no predecessor writes.
        missing_key: &'static str,
    },

    /// A round writes a different number of fields than it selects.
    #[error("round {round} selects {selection} keys for {fields} payload fields")]
    SelectionArityMismatch {
        /// The misconfigured round.
        round: K,
        /// Number of selection keys declared.
        selection: usize,
        /// Number of payload fields observed.
        fields: usize,
    },
}

/// Fatal application-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError<K: fmt::Display + fmt::Debug> {
    /// A protocol error from the current round.
    #[error(transparent)]
    Round(RoundError<K>),

    /// A synchronized data access failed.
    #[error(transparent)]
    Sync(SyncDataError),

    /// A construction error that could only be observed at run time.
    #[error(transparent)]
    Spec(SpecError<K>),

    /// A pre- or post-condition did not hold at a round boundary.
    ///
    /// This indicates a construction bug in the application's round graph,
    /// not a runtime condition.
    #[error("invariant broken entering/leaving round {round}: missing key '{key}'")]
    InvariantBroken {
        /// The round at whose boundary the check failed.
        round: K,
        /// The missing synchronized data key.
        key: String,
    },

    /// The run has terminated; no further operations are accepted.
    #[error("application has terminated in round {0}")]
    Terminated(K),

    /// A transition lookup failed at runtime.
    ///
    /// Unreachable when the spec passed validation; kept as a hard error
    /// rather than a panic.
    #[error("no transition from round {round} for event {event}")]
    MissingTransition {
        /// The current round.
        round: K,
        /// The event with no mapping.
        event: Event,
    },
}

impl<K: fmt::Display + fmt::Debug> From<RoundError<K>> for AppError<K> {
    fn from(err: RoundError<K>) -> Self {
        AppError::Round(err)
    }
}

impl<K: fmt::Display + fmt::Debug> From<SyncDataError> for AppError<K> {
    fn from(err: SyncDataError) -> Self {
        AppError::Sync(err)
    }
}

impl<K: fmt::Display + fmt::Debug> From<SpecError<K>> for AppError<K> {
    fn from(err: SpecError<K>) -> Self {
        AppError::Spec(err)
    }
}
