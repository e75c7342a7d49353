//! Market-data oracle application.
//!
//! One collecting round: every participant pulls public companies'
//! ethereum holdings from the configured data source, stores the raw
//! report in the content-addressed store, and submits the headline figures
//! plus the report hash. Once a threshold of participants agree on
//! identical figures, the agreed values land in synchronized data and the
//! run finishes.

mod behaviours;
mod params;
mod payload;
mod rounds;

pub use behaviours::DataPullBehaviour;
pub use params::OracleParams;
pub use payload::DataPullPayload;
pub use rounds::{keys, oracle_app_spec, OracleData, OracleRound};
