//! Action types for the deterministic state machine.

use crate::{ApiRequest, LedgerQuery, OutboundMessage, RequestId, TimerId};
use roundtable_types::Event;
use std::time::Duration;

/// Actions the state machine wants to perform.
///
/// Actions are **commands** - they describe something to do.
/// The runner executes actions and converts results back into inputs.
#[derive(Debug, Clone)]
pub enum Action<K> {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Broadcast a message to every participant, including ourselves.
    ///
    /// The agreement transport must deliver it to all participants;
    /// the local node receives its own submission back the same way.
    Broadcast {
        /// The message to broadcast.
        message: OutboundMessage<K>,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Set a timer to fire after a duration.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a previously set timer.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Delegated Work (async, returns callback input)
    // ═══════════════════════════════════════════════════════════════════════
    /// Fetch from the external data source.
    ///
    /// Returns `NodeInput::ApiResponseReceived` when complete.
    HttpRequest {
        /// Correlation id for the response.
        request_id: RequestId,
        /// The request to perform.
        request: ApiRequest,
    },

    /// Write data to the content-addressed store.
    ///
    /// Returns `NodeInput::StoragePutCompleted` carrying the content hash.
    StoragePut {
        /// Correlation id for the response.
        request_id: RequestId,
        /// Raw bytes to store.
        data: Vec<u8>,
    },

    /// Perform a read-only ledger query.
    ///
    /// Returns `NodeInput::LedgerCallCompleted` when complete.
    LedgerCall {
        /// Correlation id for the response.
        request_id: RequestId,
        /// The query to perform.
        query: LedgerQuery,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // External Notifications
    // ═══════════════════════════════════════════════════════════════════════
    /// Emit a resolved round for external observers.
    EmitRoundResolved {
        /// The round that resolved.
        round: K,
        /// The event it resolved with.
        event: Event,
        /// The round the application entered next.
        next: K,
    },
}

impl<K> Action<K> {
    /// Check if this action requires async I/O.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            Action::Broadcast { .. }
                | Action::HttpRequest { .. }
                | Action::StoragePut { .. }
                | Action::LedgerCall { .. }
        )
    }

    /// Check if this action is delegated collaborator work (returns a callback input).
    pub fn is_delegated(&self) -> bool {
        matches!(
            self,
            Action::HttpRequest { .. } | Action::StoragePut { .. } | Action::LedgerCall { .. }
        )
    }

    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Broadcast { .. } => "Broadcast",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::HttpRequest { .. } => "HttpRequest",
            Action::StoragePut { .. } => "StoragePut",
            Action::LedgerCall { .. } => "LedgerCall",
            Action::EmitRoundResolved { .. } => "EmitRoundResolved",
        }
    }
}
