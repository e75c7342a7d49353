//! Transaction payloads and the values rounds agree on.

use crate::{ContentHash, ParticipantId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Tag type for the closed set of round kinds an application defines.
///
/// Applications implement this on a fieldless enum. The transition table and
/// the round registry are keyed by these tags, so the full round graph is
/// known at assembly time.
pub trait RoundKind:
    Copy
    + Eq
    + Ord
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> RoundKind for T where
    T: Copy
        + Eq
        + Ord
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// A single typed payload field.
///
/// This is the closed set of value shapes that can flow through threshold
/// agreement. Floats compare bitwise (`to_bits`), which is exact for the
/// decoded-JSON values that reach payloads; NaN is rejected at decode time
/// by the API parsing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Absent value (an optional field the data source did not provide).
    None,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Content-addressed storage hash.
    Hash(ContentHash),
}

impl FieldValue {
    /// Rank used to order values of different variants.
    fn rank(&self) -> u8 {
        match self {
            FieldValue::None => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) => 2,
            FieldValue::Float(_) => 3,
            FieldValue::Text(_) => 4,
            FieldValue::Hash(_) => 5,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::None, FieldValue::None) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Hash(a), FieldValue::Hash(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FieldValue::None => {}
            FieldValue::Bool(b) => b.hash(state),
            FieldValue::Int(i) => i.hash(state),
            FieldValue::Float(f) => f.to_bits().hash(state),
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Hash(h) => h.hash(state),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Hash(a), FieldValue::Hash(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => write!(f, "none"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Hash(h) => write!(f, "{}", h),
        }
    }
}

/// A participant's proposed values for one round.
///
/// Immutable once constructed. Agreement is over the non-sender field tuple:
/// two payloads agree when their `values()` are equal, regardless of sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload<K> {
    sender: ParticipantId,
    round: K,
    fields: Vec<FieldValue>,
}

impl<K: RoundKind> TxPayload<K> {
    /// Create a new payload.
    pub fn new(sender: ParticipantId, round: K, fields: Vec<FieldValue>) -> Self {
        Self {
            sender,
            round,
            fields,
        }
    }

    /// Get the submitting participant.
    pub fn sender(&self) -> ParticipantId {
        self.sender
    }

    /// Get the round kind this payload is addressed to.
    pub fn round(&self) -> K {
        self.round
    }

    /// Get the non-sender field tuple that agreement is computed over.
    pub fn values(&self) -> &[FieldValue] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_fields_compare_bitwise() {
        let a = FieldValue::Float(1.5);
        let b = FieldValue::Float(1.5);
        let c = FieldValue::Float(1.500001);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_field_ordering_across_variants() {
        let mut values = vec![
            FieldValue::Text("b".into()),
            FieldValue::Int(7),
            FieldValue::None,
            FieldValue::Float(0.5),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                FieldValue::None,
                FieldValue::Int(7),
                FieldValue::Float(0.5),
                FieldValue::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_field_value_serde_roundtrip() {
        let values = vec![
            FieldValue::Float(42.25),
            FieldValue::Hash(ContentHash::from_bytes(b"report")),
            FieldValue::None,
        ];
        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<FieldValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(values, back);
    }
}
