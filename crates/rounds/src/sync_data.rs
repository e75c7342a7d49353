//! The replicated store of agreed values.

use crate::SyncDataError;
use im::OrdMap;
use roundtable_types::{FieldValue, ParticipantId, RoundKind, TxPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value held under one synchronized data key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncValue<K> {
    /// A single agreed field.
    Scalar(FieldValue),
    /// One round's participant-to-payload mapping, ordered by participant.
    Collection(BTreeMap<ParticipantId, TxPayload<K>>),
}

/// The replicated, versioned store of agreed values.
///
/// Every write appends under a key asserted absent beforehand; nothing is
/// overwritten in place. One snapshot is retained per committed version so
/// the full agreed history can be replayed or audited.
///
/// Writes happen only from a round's resolution step; behaviours and
/// observers get read access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize + Clone",
    deserialize = "K: serde::de::DeserializeOwned + Clone"
))]
pub struct SynchronizedData<K> {
    /// The working view, including writes not yet committed to a version.
    current: OrdMap<String, SyncValue<K>>,

    /// One immutable snapshot per committed version, oldest first.
    history: Vec<OrdMap<String, SyncValue<K>>>,
}

impl<K: RoundKind> Default for SynchronizedData<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: RoundKind> SynchronizedData<K> {
    /// Create an empty store at version zero.
    pub fn new() -> Self {
        Self {
            current: OrdMap::new(),
            history: Vec::new(),
        }
    }

    /// Get the number of committed versions.
    pub fn version(&self) -> u64 {
        self.history.len() as u64
    }

    /// Check if a key has been written.
    pub fn contains(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    /// Get the value under a key.
    ///
    /// Reading an unset key is an error; a key holding an empty collection
    /// reads back successfully.
    pub fn get(&self, key: &str) -> Result<&SyncValue<K>, SyncDataError> {
        self.current
            .get(key)
            .ok_or_else(|| SyncDataError::MissingKey(key.to_string()))
    }

    /// Get a scalar field under a key.
    pub fn get_scalar(&self, key: &str) -> Result<&FieldValue, SyncDataError> {
        match self.get(key)? {
            SyncValue::Scalar(value) => Ok(value),
            SyncValue::Collection(_) => Err(SyncDataError::WrongShape {
                key: key.to_string(),
                expected: "scalar",
            }),
        }
    }

    /// Get a participant-to-payload collection under a key.
    pub fn get_collection(
        &self,
        key: &str,
    ) -> Result<&BTreeMap<ParticipantId, TxPayload<K>>, SyncDataError> {
        match self.get(key)? {
            SyncValue::Collection(collection) => Ok(collection),
            SyncValue::Scalar(_) => Err(SyncDataError::WrongShape {
                key: key.to_string(),
                expected: "collection",
            }),
        }
    }

    /// Write a value under a key that must not exist yet.
    pub fn insert_new(&mut self, key: &str, value: SyncValue<K>) -> Result<(), SyncDataError> {
        if self.current.contains_key(key) {
            return Err(SyncDataError::KeyAlreadySet(key.to_string()));
        }
        self.current.insert(key.to_string(), value);
        Ok(())
    }

    /// Commit the working view as a new version.
    ///
    /// Returns the new version number. Called once per round resolution
    /// that wrote anything.
    pub fn commit(&mut self) -> u64 {
        self.history.push(self.current.clone());
        self.version()
    }

    /// Get a committed snapshot by version number (1-based).
    pub fn snapshot(&self, version: u64) -> Option<&OrdMap<String, SyncValue<K>>> {
        if version == 0 {
            return None;
        }
        self.history.get(version as usize - 1)
    }
}
