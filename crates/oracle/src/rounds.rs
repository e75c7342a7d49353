//! Round kinds and application spec for the oracle.

use roundtable_rounds::{
    AbciAppSpec, RoundDef, SpecError, SyncDataError, SynchronizedData,
};
use roundtable_types::{ContentHash, Event, FieldValue, ParticipantId, TxPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Synchronized data keys the oracle writes.
pub mod keys {
    /// Participant-to-payload mapping for the data pull round.
    pub const PARTICIPANT_TO_DATA_ROUND: &str = "participant_to_data_round";
    /// Agreed total holdings.
    pub const TOTAL_HOLDINGS: &str = "total_holdings";
    /// Agreed total value in USD.
    pub const TOTAL_VALUE_USD: &str = "total_value_usd";
    /// Agreed market cap dominance.
    pub const MARKET_CAP_DOMINANCE: &str = "market_cap_dominance";
    /// Content hash of the agreed raw holdings report.
    pub const HOLDINGS_REPORT_HASH: &str = "holdings_report_hash";
}

/// Selection keys of the data pull round, in payload field order.
const DATA_PULL_SELECTION: &[&str] = &[
    keys::TOTAL_HOLDINGS,
    keys::TOTAL_VALUE_USD,
    keys::MARKET_CAP_DOMINANCE,
    keys::HOLDINGS_REPORT_HASH,
];

/// The oracle's round kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum OracleRound {
    /// Pull holdings data and agree on it.
    DataPull,
    /// Terminal state after agreement.
    FinishedDataPull,
}

impl fmt::Display for OracleRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleRound::DataPull => write!(f, "data_pull"),
            OracleRound::FinishedDataPull => write!(f, "finished_data_pull"),
        }
    }
}

/// Build the oracle's application spec.
///
/// `DataPull` self-loops on no-majority and timeout and finishes on
/// agreement; `FinishedDataPull` is degenerate.
pub fn oracle_app_spec() -> Result<AbciAppSpec<OracleRound>, SpecError<OracleRound>> {
    AbciAppSpec::builder(OracleRound::DataPull)
        .round(
            RoundDef::collect(
                OracleRound::DataPull,
                Event::Done,
                Event::NoMajority,
                keys::PARTICIPANT_TO_DATA_ROUND,
                DATA_PULL_SELECTION,
            )
            .with_post_conditions(DATA_PULL_SELECTION),
        )
        .round(
            RoundDef::degenerate(OracleRound::FinishedDataPull)
                .with_pre_conditions(DATA_PULL_SELECTION),
        )
        .transition(OracleRound::DataPull, Event::Done, OracleRound::FinishedDataPull)
        .transition(OracleRound::DataPull, Event::NoMajority, OracleRound::DataPull)
        .transition(OracleRound::DataPull, Event::RoundTimeout, OracleRound::DataPull)
        .final_state(OracleRound::FinishedDataPull)
        .build()
}

/// Typed read access to the oracle's agreed values.
pub trait OracleData {
    /// Agent-to-payload mapping for the data pull round.
    fn participant_to_data_round(
        &self,
    ) -> Result<&BTreeMap<ParticipantId, TxPayload<OracleRound>>, SyncDataError>;

    /// Agreed total holdings.
    fn total_holdings(&self) -> Result<&FieldValue, SyncDataError>;

    /// Agreed total value in USD.
    fn total_value_usd(&self) -> Result<&FieldValue, SyncDataError>;

    /// Agreed market cap dominance.
    fn market_cap_dominance(&self) -> Result<&FieldValue, SyncDataError>;

    /// Content hash of the agreed raw holdings report.
    fn holdings_report_hash(&self) -> Result<ContentHash, SyncDataError>;
}

impl OracleData for SynchronizedData<OracleRound> {
    fn participant_to_data_round(
        &self,
    ) -> Result<&BTreeMap<ParticipantId, TxPayload<OracleRound>>, SyncDataError> {
        self.get_collection(keys::PARTICIPANT_TO_DATA_ROUND)
    }

    fn total_holdings(&self) -> Result<&FieldValue, SyncDataError> {
        self.get_scalar(keys::TOTAL_HOLDINGS)
    }

    fn total_value_usd(&self) -> Result<&FieldValue, SyncDataError> {
        self.get_scalar(keys::TOTAL_VALUE_USD)
    }

    fn market_cap_dominance(&self) -> Result<&FieldValue, SyncDataError> {
        self.get_scalar(keys::MARKET_CAP_DOMINANCE)
    }

    fn holdings_report_hash(&self) -> Result<ContentHash, SyncDataError> {
        match self.get_scalar(keys::HOLDINGS_REPORT_HASH)? {
            FieldValue::Hash(hash) => Ok(*hash),
            _ => Err(SyncDataError::WrongShape {
                key: keys::HOLDINGS_REPORT_HASH.to_string(),
                expected: "scalar",
            }),
        }
    }
}
