//! External data source descriptors.
//!
//! An [`ApiSpec`] describes one endpoint of the external data source: how
//! to build the request and which response fields feed the payload. The
//! engine stays agnostic to the transport; the runner moves raw bytes and
//! the spec turns them into typed field values.

use roundtable_core::{ApiRequest, ApiResponse, IoError};
use roundtable_types::FieldValue;

/// The expected type of one extracted response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Floating point number.
    Float,
    /// Signed integer.
    Int,
    /// UTF-8 text.
    Text,
    /// Boolean flag.
    Bool,
}

/// Descriptor for one external data source endpoint.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    /// Fully rendered URL including query parameters.
    pub url: String,

    /// Request method.
    pub method: String,

    /// Header name/value pairs, e.g. an API key header.
    pub headers: Vec<(String, String)>,

    /// Response fields to extract: JSON pointer and expected type, in
    /// payload field order.
    pub response_fields: Vec<(String, FieldKind)>,
}

impl ApiSpec {
    /// Create a GET spec with no headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: Vec::new(),
            response_fields: Vec::new(),
        }
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a response field to extract.
    pub fn with_field(mut self, pointer: impl Into<String>, kind: FieldKind) -> Self {
        self.response_fields.push((pointer.into(), kind));
        self
    }

    /// Build the request for this spec.
    pub fn request(&self) -> ApiRequest {
        ApiRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Parse a raw response into the spec's field values, in order.
    ///
    /// Non-success statuses, malformed JSON, missing pointers, type
    /// mismatches and non-finite numbers all surface as decode errors for
    /// the behaviour's retry policy to handle.
    pub fn parse(&self, response: &ApiResponse) -> Result<Vec<FieldValue>, IoError> {
        if !response.is_success() {
            return Err(IoError::Http(response.status));
        }

        let body: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| IoError::Decode(e.to_string()))?;

        let mut fields = Vec::with_capacity(self.response_fields.len());
        for (pointer, kind) in &self.response_fields {
            let value = body
                .pointer(pointer)
                .ok_or_else(|| IoError::Decode(format!("missing field '{}'", pointer)))?;

            let field = match (kind, value) {
                (_, serde_json::Value::Null) => FieldValue::None,
                (FieldKind::Float, v) => {
                    let num = v.as_f64().ok_or_else(|| {
                        IoError::Decode(format!("field '{}' is not a number", pointer))
                    })?;
                    if !num.is_finite() {
                        return Err(IoError::Decode(format!(
                            "field '{}' is not finite",
                            pointer
                        )));
                    }
                    FieldValue::Float(num)
                }
                (FieldKind::Int, v) => FieldValue::Int(v.as_i64().ok_or_else(|| {
                    IoError::Decode(format!("field '{}' is not an integer", pointer))
                })?),
                (FieldKind::Text, v) => FieldValue::Text(
                    v.as_str()
                        .ok_or_else(|| {
                            IoError::Decode(format!("field '{}' is not a string", pointer))
                        })?
                        .to_string(),
                ),
                (FieldKind::Bool, v) => FieldValue::Bool(v.as_bool().ok_or_else(|| {
                    IoError::Decode(format!("field '{}' is not a boolean", pointer))
                })?),
            };
            fields.push(field);
        }

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holdings_spec() -> ApiSpec {
        ApiSpec::get("https://api.example.com/companies/ethereum")
            .with_header("x-api-key", "test-key")
            .with_field("/total_holdings", FieldKind::Float)
            .with_field("/total_value_usd", FieldKind::Float)
            .with_field("/market_cap_dominance", FieldKind::Float)
    }

    fn response(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_request_carries_headers() {
        let request = holdings_spec().request();
        assert_eq!(request.method, "GET");
        assert_eq!(
            request.headers,
            vec![("x-api-key".to_string(), "test-key".to_string())]
        );
    }

    #[test]
    fn test_parse_extracts_fields_in_order() {
        let fields = holdings_spec()
            .parse(&response(
                r#"{"total_holdings": 100.5, "total_value_usd": 2.5e8, "market_cap_dominance": 1.2}"#,
            ))
            .unwrap();

        assert_eq!(
            fields,
            vec![
                FieldValue::Float(100.5),
                FieldValue::Float(2.5e8),
                FieldValue::Float(1.2),
            ]
        );
    }

    #[test]
    fn test_parse_null_becomes_none() {
        let fields = holdings_spec()
            .parse(&response(
                r#"{"total_holdings": null, "total_value_usd": 1.0, "market_cap_dominance": 2.0}"#,
            ))
            .unwrap();
        assert_eq!(fields[0], FieldValue::None);
    }

    #[test]
    fn test_parse_rejects_http_error() {
        let err = holdings_spec()
            .parse(&ApiResponse {
                status: 503,
                body: vec![],
            })
            .unwrap_err();
        assert_eq!(err, IoError::Http(503));
        assert!(err.is_transient());
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let err = holdings_spec()
            .parse(&response(r#"{"total_holdings": 1.0}"#))
            .unwrap_err();
        assert!(matches!(err, IoError::Decode(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let err = holdings_spec()
            .parse(&response(
                r#"{"total_holdings": "many", "total_value_usd": 1.0, "market_cap_dominance": 2.0}"#,
            ))
            .unwrap_err();
        assert!(matches!(err, IoError::Decode(_)));
    }
}
