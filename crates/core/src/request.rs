//! Collaborator request tracking.

/// Opaque identifier for tracking collaborator requests through the system.
///
/// The runner maintains a map of `RequestId` -> in-flight work. A behaviour
/// that suspends on I/O resumes only when the input carrying its request id
/// arrives. This keeps async response handling out of the sync state machine.
///
/// # Example
///
/// ```ignore
/// // In the runner:
/// let request_id = RequestId(self.next_request_id);
/// self.next_request_id += 1;
///
/// let response = http_client.get(request.url).await;
///
/// // Deliver back to the state machine:
/// self.input_tx.send(NodeInput::ApiResponseReceived { request_id, result }).await;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Create a new request ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}
