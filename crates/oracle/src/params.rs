//! Oracle parameters.

use roundtable_behaviours::{ApiSpec, FieldKind, RetryPolicy};

/// Default public-treasury endpoint of the data source.
const DEFAULT_HOLDINGS_URL: &str =
    "https://api.coingecko.com/api/v3/companies/public_treasury/ethereum";

/// Configuration for the oracle application.
#[derive(Debug, Clone)]
pub struct OracleParams {
    /// Holdings endpoint URL.
    pub holdings_url: String,

    /// Optional data source API key, sent as `x-cg-api-key`.
    pub api_key: Option<String>,

    /// Retry policy for collaborator calls.
    pub retry: RetryPolicy,

    /// Optional counter contract to read a checkpoint count from before
    /// each pull.
    pub counter_address: Option<String>,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            holdings_url: DEFAULT_HOLDINGS_URL.to_string(),
            api_key: None,
            retry: RetryPolicy::default(),
            counter_address: None,
        }
    }
}

impl OracleParams {
    /// Build the holdings endpoint spec: the three headline figures in
    /// payload field order.
    pub fn holdings_spec(&self) -> ApiSpec {
        let mut spec = ApiSpec::get(self.holdings_url.clone())
            .with_field("/total_holdings", FieldKind::Float)
            .with_field("/total_value_usd", FieldKind::Float)
            .with_field("/market_cap_dominance", FieldKind::Float);

        if let Some(api_key) = &self.api_key {
            spec = spec.with_header("x-cg-api-key", api_key.clone());
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdings_spec_carries_api_key() {
        let params = OracleParams {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };

        let request = params.holdings_spec().request();
        assert!(request
            .headers
            .contains(&("x-cg-api-key".to_string(), "secret".to_string())));
    }

    #[test]
    fn test_holdings_spec_extracts_three_fields() {
        let spec = OracleParams::default().holdings_spec();
        assert_eq!(spec.response_fields.len(), 3);
    }
}
