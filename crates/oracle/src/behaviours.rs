//! Round behaviours of the oracle.

use crate::{DataPullPayload, OracleParams, OracleRound};
use roundtable_behaviours::{
    ApiSpec, Behaviour, BehaviourContext, Effect, Progress, Resumption, Step,
};
use roundtable_core::{IoError, LedgerQuery};
use roundtable_types::FieldValue;
use tracing::{debug, info, warn};

/// Where a backoff should resume.
enum RetryTarget {
    /// Re-fetch from the data source.
    Fetch,
    /// Re-store the already-fetched report.
    Store {
        fields: Vec<FieldValue>,
        report: Vec<u8>,
    },
}

/// What the behaviour is waiting on.
enum Phase {
    Idle,
    ReadingCounter,
    Fetching,
    Storing {
        fields: Vec<FieldValue>,
        report: Vec<u8>,
    },
    BackingOff(RetryTarget),
}

/// Pulls public companies' ethereum holdings, stores the raw report and
/// submits the headline figures plus the report hash.
///
/// Re-entry after a no-majority or timeout repeats the pull from the top;
/// both the fetch and the content-store write are idempotent, so the
/// at-least-once execution the scheduler imposes is safe.
pub struct DataPullBehaviour {
    params: OracleParams,
    spec: ApiSpec,
    phase: Phase,
    failed_attempts: u32,
}

impl DataPullBehaviour {
    /// Create the behaviour from oracle parameters.
    pub fn new(params: OracleParams) -> Self {
        let spec = params.holdings_spec();
        Self {
            params,
            spec,
            phase: Phase::Idle,
            failed_attempts: 0,
        }
    }

    fn start_fetch(&mut self) -> Progress<OracleRound> {
        self.phase = Phase::Fetching;
        Progress::Await(Effect::HttpGet(self.spec.request()))
    }

    /// Back off and retry, or cede once the attempt budget is spent.
    fn retry(&mut self, err: IoError, target: RetryTarget) -> Progress<OracleRound> {
        self.failed_attempts += 1;

        if !err.is_transient() {
            warn!(error = %err, "Collaborator call failed permanently");
            self.phase = Phase::Idle;
            return Progress::Ceded;
        }

        match self.params.retry.backoff_for(self.failed_attempts) {
            Some(backoff) => {
                debug!(
                    error = %err,
                    attempt = self.failed_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    "Collaborator call failed, backing off"
                );
                self.phase = Phase::BackingOff(target);
                Progress::Await(Effect::Sleep(backoff))
            }
            None => {
                warn!(
                    error = %err,
                    attempts = self.failed_attempts,
                    "Retries exhausted, ceding without a submission"
                );
                self.phase = Phase::Idle;
                Progress::Ceded
            }
        }
    }

    fn on_report_fetched(
        &mut self,
        fields: Vec<FieldValue>,
        report: Vec<u8>,
    ) -> Progress<OracleRound> {
        info!(
            total_holdings = %fields[0],
            total_value_usd = %fields[1],
            market_cap_dominance = %fields[2],
            "Got public company holdings from the data source"
        );

        self.phase = Phase::Storing {
            fields,
            report: report.clone(),
        };
        Progress::Await(Effect::StoragePut(report))
    }
}

impl Behaviour<OracleRound> for DataPullBehaviour {
    fn matching_round(&self) -> OracleRound {
        OracleRound::DataPull
    }

    fn step(
        &mut self,
        step: Step,
        ctx: &BehaviourContext<'_, OracleRound>,
    ) -> Progress<OracleRound> {
        match (step, std::mem::replace(&mut self.phase, Phase::Idle)) {
            (Step::Start, _) => {
                self.failed_attempts = 0;

                if let Some(address) = self.params.counter_address.clone() {
                    self.phase = Phase::ReadingCounter;
                    return Progress::Await(Effect::LedgerCall(LedgerQuery::ContractCall {
                        method: "getCount".to_string(),
                        address,
                    }));
                }
                self.start_fetch()
            }

            (Step::Resume(Resumption::Ledger(result)), Phase::ReadingCounter) => {
                // The checkpoint count is informational; a failed read
                // never blocks the pull.
                match result {
                    Ok(value) => info!(count = %value.0, "Read checkpoint count"),
                    Err(err) => warn!(error = %err, "Counter read failed, continuing"),
                }
                self.start_fetch()
            }

            (Step::Resume(Resumption::Api(Ok(response))), Phase::Fetching) => {
                match self.spec.parse(&response) {
                    Ok(fields) => self.on_report_fetched(fields, response.body),
                    Err(err) => self.retry(err, RetryTarget::Fetch),
                }
            }
            (Step::Resume(Resumption::Api(Err(err))), Phase::Fetching) => {
                self.retry(err, RetryTarget::Fetch)
            }

            (Step::Resume(Resumption::Storage(Ok(hash))), Phase::Storing { fields, .. }) => {
                info!(report_hash = %hash, "Holdings report stored");

                match DataPullPayload::from_fields(&fields, hash) {
                    Some(payload) => Progress::Submit(payload.into_payload(ctx.sender)),
                    None => {
                        warn!("Fetched fields do not form a payload");
                        Progress::Ceded
                    }
                }
            }
            (Step::Resume(Resumption::Storage(Err(err))), Phase::Storing { fields, report }) => {
                self.retry(err, RetryTarget::Store { fields, report })
            }

            (Step::Resume(Resumption::SleepElapsed), Phase::BackingOff(target)) => match target {
                RetryTarget::Fetch => self.start_fetch(),
                RetryTarget::Store { fields, report } => {
                    self.phase = Phase::Storing {
                        fields,
                        report: report.clone(),
                    };
                    Progress::Await(Effect::StoragePut(report))
                }
            },

            (step, _) => {
                warn!(?step, "Unexpected resumption for current phase");
                Progress::Ceded
            }
        }
    }
}
