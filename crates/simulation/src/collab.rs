//! Scripted collaborator stand-ins.
//!
//! Each node gets deterministic responses for its API fetches, content
//! store writes and ledger reads. Scripts drive the scenario tests:
//! identical responses for agreement, divergent responses for
//! no-majority, failures for retry and timeout paths.

use crate::NodeIndex;
use roundtable_core::{ApiRequest, ApiResponse, IoError, LedgerQuery, LedgerValue};
use roundtable_types::{ContentHash, FieldValue};
use std::collections::BTreeMap;

/// A per-node response script for the external data source.
#[derive(Debug, Clone)]
pub struct ApiScript {
    /// Responses served in order; the last one repeats once the script is
    /// exhausted.
    responses: Vec<Result<ApiResponse, IoError>>,
    /// How many calls this node has made.
    calls: usize,
}

impl ApiScript {
    /// Always answer 200 with this body.
    pub fn ok(body: &str) -> Self {
        Self {
            responses: vec![Ok(ApiResponse {
                status: 200,
                body: body.as_bytes().to_vec(),
            })],
            calls: 0,
        }
    }

    /// Always fail with a transport timeout.
    pub fn unreachable() -> Self {
        Self {
            responses: vec![Err(IoError::Timeout)],
            calls: 0,
        }
    }

    /// Serve the given responses in order, repeating the last.
    pub fn sequence(responses: Vec<Result<ApiResponse, IoError>>) -> Self {
        Self {
            responses,
            calls: 0,
        }
    }

    /// Fail `failures` times, then answer 200 with this body.
    pub fn flaky(failures: usize, body: &str) -> Self {
        let mut responses: Vec<Result<ApiResponse, IoError>> =
            vec![Err(IoError::Timeout); failures];
        responses.push(Ok(ApiResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }));
        Self {
            responses,
            calls: 0,
        }
    }

    fn next(&mut self) -> Result<ApiResponse, IoError> {
        let index = self.calls.min(self.responses.len() - 1);
        self.calls += 1;
        self.responses[index].clone()
    }
}

/// The external data source, scripted per node.
#[derive(Debug, Clone, Default)]
pub struct SimApiSource {
    scripts: BTreeMap<NodeIndex, ApiScript>,
}

impl SimApiSource {
    /// Give every node the same always-ok script.
    pub fn uniform(num_nodes: u32, body: &str) -> Self {
        let scripts = (0..num_nodes).map(|n| (n, ApiScript::ok(body))).collect();
        Self { scripts }
    }

    /// Replace one node's script.
    pub fn with_script(mut self, node: NodeIndex, script: ApiScript) -> Self {
        self.scripts.insert(node, script);
        self
    }

    /// Answer a node's request.
    pub fn respond(&mut self, node: NodeIndex, request: &ApiRequest) -> Result<ApiResponse, IoError> {
        let _ = request;
        match self.scripts.get_mut(&node) {
            Some(script) => script.next(),
            None => Err(IoError::Network("no script for node".to_string())),
        }
    }
}

/// In-memory content-addressed store, one per node.
#[derive(Debug, Clone, Default)]
pub struct SimContentStore {
    blobs: BTreeMap<ContentHash, Vec<u8>>,
}

impl SimContentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store data, returning its content hash.
    pub fn put(&mut self, data: Vec<u8>) -> ContentHash {
        let hash = ContentHash::from_bytes(&data);
        self.blobs.insert(hash, data);
        hash
    }

    /// Fetch data back by hash.
    pub fn get(&self, hash: &ContentHash) -> Option<&[u8]> {
        self.blobs.get(hash).map(|b| b.as_slice())
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Static read-only ledger stand-in.
#[derive(Debug, Clone)]
pub struct SimLedger {
    /// Counter value served for `getCount`.
    count: i64,
}

impl SimLedger {
    /// Create a ledger whose counter reads `count`.
    pub fn new(count: i64) -> Self {
        Self { count }
    }

    /// Answer a read-only query.
    pub fn call(&self, query: &LedgerQuery) -> Result<LedgerValue, IoError> {
        match query {
            LedgerQuery::ContractCall { method, .. } if method == "getCount" => {
                Ok(LedgerValue(FieldValue::Int(self.count)))
            }
            LedgerQuery::ContractCall { method, .. } => Err(IoError::Decode(format!(
                "unknown contract method '{}'",
                method
            ))),
        }
    }
}

impl Default for SimLedger {
    fn default() -> Self {
        Self::new(0)
    }
}
