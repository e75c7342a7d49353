//! Input types for the deterministic state machine.

use crate::{ApiResponse, IoError, LedgerValue, RequestId, TimerId};
use roundtable_messages::PayloadGossip;
use roundtable_types::ContentHash;

/// Priority levels for input ordering within the same timestamp.
///
/// Inputs at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// This ensures causality is preserved: timer consequences are handled
/// before new external inputs arriving at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum InputPriority {
    /// Timer inputs: scheduled by the node itself.
    Timer = 0,

    /// Network inputs: gossip from other participants and collaborator
    /// responses delivered by the runner.
    Network = 1,

    /// Client inputs: external kick-offs from the operator.
    Client = 2,
}

/// All possible inputs a node can receive.
///
/// Inputs are **passive data** - they describe something that happened.
/// The state machine processes inputs and returns actions.
#[derive(Debug, Clone)]
pub enum NodeInput<K> {
    // ═══════════════════════════════════════════════════════════════════════
    // Client (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// Start the node: enters the initial round and starts its behaviour.
    Genesis,

    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// A previously set timer fired.
    TimerFired {
        /// Which timer fired.
        id: TimerId,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Network (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// Received a payload submission from a participant.
    ///
    /// Sender identity comes from the payload itself; duplicate delivery for
    /// the same round is rejected by the round, not assumed filtered by the
    /// transport.
    PayloadReceived {
        /// The gossiped payload.
        gossip: PayloadGossip<K>,
    },

    /// A previously issued external data request completed.
    ApiResponseReceived {
        /// Correlates with the `Action::HttpRequest` that started the call.
        request_id: RequestId,
        /// Raw response or transport error.
        result: Result<ApiResponse, IoError>,
    },

    /// A previously issued content-store write completed.
    StoragePutCompleted {
        /// Correlates with the `Action::StoragePut` that started the write.
        request_id: RequestId,
        /// Content hash of the stored data, or the error.
        result: Result<ContentHash, IoError>,
    },

    /// A previously issued ledger query completed.
    LedgerCallCompleted {
        /// Correlates with the `Action::LedgerCall` that started the query.
        request_id: RequestId,
        /// Decoded value, or the error.
        result: Result<LedgerValue, IoError>,
    },
}

impl<K> NodeInput<K> {
    /// Get the ordering priority of this input.
    pub fn priority(&self) -> InputPriority {
        match self {
            NodeInput::Genesis => InputPriority::Client,
            NodeInput::TimerFired { .. } => InputPriority::Timer,
            NodeInput::PayloadReceived { .. }
            | NodeInput::ApiResponseReceived { .. }
            | NodeInput::StoragePutCompleted { .. }
            | NodeInput::LedgerCallCompleted { .. } => InputPriority::Network,
        }
    }

    /// Get the input type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeInput::Genesis => "Genesis",
            NodeInput::TimerFired { .. } => "TimerFired",
            NodeInput::PayloadReceived { .. } => "PayloadReceived",
            NodeInput::ApiResponseReceived { .. } => "ApiResponseReceived",
            NodeInput::StoragePutCompleted { .. } => "StoragePutCompleted",
            NodeInput::LedgerCallCompleted { .. } => "LedgerCallCompleted",
        }
    }
}
