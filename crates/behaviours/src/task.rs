//! The resumable task model behaviours are written against.

use crate::BehaviourContext;
use roundtable_core::{ApiRequest, ApiResponse, IoError, LedgerQuery, LedgerValue};
use roundtable_types::{ContentHash, RoundKind, TxPayload};
use std::time::Duration;

/// An external effect a behaviour suspends on.
///
/// Exactly one effect is outstanding per behaviour at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch from the external data source.
    HttpGet(ApiRequest),

    /// Write raw bytes to the content-addressed store.
    StoragePut(Vec<u8>),

    /// Perform a read-only ledger query.
    LedgerCall(LedgerQuery),

    /// Wait out a retry backoff.
    Sleep(Duration),
}

/// The value a suspended behaviour is resumed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resumption {
    /// Response to an [`Effect::HttpGet`].
    Api(Result<ApiResponse, IoError>),

    /// Response to an [`Effect::StoragePut`]: the content hash.
    Storage(Result<ContentHash, IoError>),

    /// Response to an [`Effect::LedgerCall`].
    Ledger(Result<LedgerValue, IoError>),

    /// An [`Effect::Sleep`] elapsed.
    SleepElapsed,
}

/// Input to one behaviour step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Begin, or re-enter after the bound round was (re-)entered.
    ///
    /// Behaviours must reset their internal progress here: re-entry after
    /// a no-majority or timeout repeats local side effects, which is why
    /// behaviours are required to be idempotent.
    Start,

    /// Deliver the resumption value for the outstanding suspension.
    Resume(Resumption),
}

/// What a behaviour decided to do with its step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress<K> {
    /// Issue the effect and suspend until its resumption arrives.
    Await(Effect),

    /// Broadcast the payload into the bound round, then suspend until the
    /// round resolves. The scheduler terminates the behaviour on
    /// resolution and hands control to the behaviour of whatever round
    /// the application entered.
    Submit(TxPayload<K>),

    /// Cede control without submitting (e.g. retries exhausted).
    ///
    /// The behaviour is restarted when its round is next entered; it never
    /// blocks the round, which can still conclude via threshold, timeout
    /// or unreachable majority.
    Ceded,
}

/// A participant's local task bound to one round kind.
pub trait Behaviour<K: RoundKind>: Send {
    /// The round kind this behaviour is bound to.
    fn matching_round(&self) -> K;

    /// Drive the behaviour one step.
    ///
    /// Called with [`Step::Start`] when the bound round is entered and
    /// with [`Step::Resume`] when the outstanding suspension completes.
    fn step(&mut self, step: Step, ctx: &BehaviourContext<'_, K>) -> Progress<K>;
}
