//! Collaborator seam types.
//!
//! The engine only sees these shapes at its boundary: the HTTP fetcher, the
//! content-addressed store and the ledger are external collaborators whose
//! transports are a runner concern.

use roundtable_types::FieldValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request to the external data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Request method (`GET` for every spec the oracle uses today).
    pub method: String,
    /// Fully rendered URL including query parameters.
    pub url: String,
    /// Header name/value pairs, e.g. an API key header.
    pub headers: Vec<(String, String)>,
}

/// A raw response from the external data source.
///
/// Parsing into a structured value is the behaviour's job (via its
/// `ApiSpec`); the runner only moves bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Check if the status code indicates success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A read-only query against the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerQuery {
    /// Call a read-only contract method at an address.
    ContractCall {
        /// Method name, e.g. `getCount`.
        method: String,
        /// Contract address.
        address: String,
    },
}

/// A value returned by the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerValue(pub FieldValue);

/// Errors surfaced by collaborator I/O.
///
/// These are transient operational conditions, not protocol errors: the
/// behaviour that issued the request decides whether to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// The collaborator answered with a non-success status.
    #[error("HTTP status {0}")]
    Http(u16),

    /// The request never completed.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out at the transport level.
    #[error("request timed out")]
    Timeout,

    /// The response arrived but could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The content-addressed store rejected the write.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IoError {
    /// Check if retrying this error can plausibly succeed.
    ///
    /// Decode errors are deterministic for a given response and retrying a
    /// malformed body is wasted work, but a fresh fetch may return a well
    /// formed one, so only repeated failures should exhaust the policy.
    pub fn is_transient(&self) -> bool {
        match self {
            IoError::Http(status) => *status >= 500 || *status == 429,
            IoError::Network(_) | IoError::Timeout => true,
            IoError::Decode(_) => true,
            IoError::Storage(_) => true,
        }
    }
}
