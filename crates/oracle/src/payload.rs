//! The data pull round's payload.

use crate::OracleRound;
use roundtable_types::{ContentHash, FieldValue, ParticipantId, TxPayload};

/// The values one participant proposes in the data pull round.
///
/// The headline figures are optional because the data source may omit
/// them; an omitted figure still takes part in agreement as an explicit
/// absent value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPullPayload {
    /// Total ethereum holdings across tracked companies.
    pub total_holdings: Option<f64>,
    /// Total value of those holdings in USD.
    pub total_value_usd: Option<f64>,
    /// Holdings as a share of market cap.
    pub market_cap_dominance: Option<f64>,
    /// Content hash of the raw holdings report.
    pub holdings_report_hash: ContentHash,
}

fn optional_float(value: Option<f64>) -> FieldValue {
    match value {
        Some(x) => FieldValue::Float(x),
        None => FieldValue::None,
    }
}

impl DataPullPayload {
    /// Build the wire payload, fields in selection-key order.
    pub fn into_payload(self, sender: ParticipantId) -> TxPayload<OracleRound> {
        TxPayload::new(
            sender,
            OracleRound::DataPull,
            vec![
                optional_float(self.total_holdings),
                optional_float(self.total_value_usd),
                optional_float(self.market_cap_dominance),
                FieldValue::Hash(self.holdings_report_hash),
            ],
        )
    }

    /// Build from parsed API fields plus the stored report's hash.
    ///
    /// `fields` must be the three holdings figures in spec order, as
    /// produced by the oracle's `ApiSpec`.
    pub fn from_fields(fields: &[FieldValue], report_hash: ContentHash) -> Option<Self> {
        let float_at = |i: usize| match fields.get(i)? {
            FieldValue::Float(x) => Some(Some(*x)),
            FieldValue::None => Some(None),
            _ => None,
        };

        Some(Self {
            total_holdings: float_at(0)?,
            total_value_usd: float_at(1)?,
            market_cap_dominance: float_at(2)?,
            holdings_report_hash: report_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_field_order_matches_selection_keys() {
        let hash = ContentHash::from_bytes(b"report");
        let payload = DataPullPayload {
            total_holdings: Some(100.5),
            total_value_usd: Some(2.5e8),
            market_cap_dominance: None,
            holdings_report_hash: hash,
        }
        .into_payload(ParticipantId(3));

        assert_eq!(payload.sender(), ParticipantId(3));
        assert_eq!(payload.round(), OracleRound::DataPull);
        assert_eq!(
            payload.values(),
            &[
                FieldValue::Float(100.5),
                FieldValue::Float(2.5e8),
                FieldValue::None,
                FieldValue::Hash(hash),
            ]
        );
    }

    #[test]
    fn test_from_fields_roundtrip() {
        let hash = ContentHash::from_bytes(b"report");
        let fields = vec![
            FieldValue::Float(1.0),
            FieldValue::None,
            FieldValue::Float(3.0),
        ];

        let payload = DataPullPayload::from_fields(&fields, hash).unwrap();
        assert_eq!(payload.total_holdings, Some(1.0));
        assert_eq!(payload.total_value_usd, None);
        assert_eq!(payload.market_cap_dominance, Some(3.0));
    }

    #[test]
    fn test_from_fields_rejects_wrong_types() {
        let hash = ContentHash::from_bytes(b"report");
        let fields = vec![
            FieldValue::Text("many".to_string()),
            FieldValue::Float(2.0),
            FieldValue::Float(3.0),
        ];
        assert!(DataPullPayload::from_fields(&fields, hash).is_none());
    }
}
