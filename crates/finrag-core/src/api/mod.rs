//! Transport to the financial Q&A backend.
//!
//! Every call resolves to a [`RequestOutcome`]; callers never deal with
//! `reqwest` errors directly.

pub mod client;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use client::HttpBackend;

pub const INGEST_PATH: &str = "/api/v1/ingest/company";
pub const QUERY_PATH: &str = "/api/v1/query/";
pub const HEALTH_PATH: &str = "/api/v1/health/";

/// Result of one backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    Success(T),
    Failure(RequestFailure),
}

impl<T> RequestOutcome<T> {
    pub fn into_result(self) -> Result<T, RequestFailure> {
        match self {
            RequestOutcome::Success(payload) => Ok(payload),
            RequestOutcome::Failure(failure) => Err(failure),
        }
    }
}

/// Why a call did not produce a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
    /// The backend answered with a non-2xx status
    #[error("{}", server_reason(.status, .detail))]
    Server { status: u16, detail: Option<String> },

    /// No response arrived: connection refused, reset, or dropped mid-flight
    #[error("could not reach server: {0}")]
    Unreachable(String),

    /// A response arrived but its body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RequestFailure {
    /// True when the backend was never heard from properly, as opposed to
    /// the backend rejecting the request.
    pub fn is_transport(&self) -> bool {
        !matches!(self, RequestFailure::Server { .. })
    }

    /// The server-supplied `detail`, if there was one
    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestFailure::Server { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

fn server_reason(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!("server returned HTTP {}", status),
    }
}

/// Body returned by a successful ingestion. Every field is optional; the
/// client only displays it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestPayload {
    pub status: Option<String>,
    pub company: Option<String>,
    pub statements: Option<u64>,
    pub chunks: Option<u64>,
    pub calculated_ratios: Option<u64>,
    pub validation: Option<Value>,
    pub message: Option<String>,
}

impl IngestPayload {
    /// One-line confirmation, e.g. `Apple Inc. · 12 statements · 40 chunks`
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(company) = self.company.as_deref().filter(|c| !c.is_empty()) {
            parts.push(company.to_string());
        }
        if let Some(n) = self.statements {
            parts.push(format!("{} statements", n));
        }
        if let Some(n) = self.chunks {
            parts.push(format!("{} chunks", n));
        }
        if let Some(n) = self.calculated_ratios.filter(|n| *n > 0) {
            parts.push(format!("{} ratios", n));
        }
        parts.join(" · ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub answer: String,
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub sources: Vec<Value>,
}

impl QueryPayload {
    /// Classification caption shown under an answer, when the backend sent one
    pub fn caption(&self) -> Option<String> {
        match (self.query_type.as_deref(), self.confidence.as_deref()) {
            (Some(kind), Some(confidence)) => {
                Some(format!("{} query · {} confidence", kind, confidence))
            }
            (Some(kind), None) => Some(format!("{} query", kind)),
            (None, Some(confidence)) => Some(format!("{} confidence", confidence)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub(crate) struct IngestRequest<'a> {
    pub ticker: &'a str,
}

#[derive(Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub query: &'a str,
    pub ticker: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// The calls the interaction controller needs from a backend.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn ingest(&self, ticker: &str) -> RequestOutcome<IngestPayload>;

    async fn query(&self, ticker: &str, question: &str) -> RequestOutcome<QueryPayload>;

    async fn health(&self) -> RequestOutcome<HealthStatus>;
}

/// Turn a status code and raw body into an outcome.
pub(crate) fn decode_response<T: DeserializeOwned>(status: u16, body: &[u8]) -> RequestOutcome<T> {
    if !(200..300).contains(&status) {
        return RequestOutcome::Failure(RequestFailure::Server {
            status,
            detail: error_detail(body),
        });
    }

    match serde_json::from_slice::<T>(body) {
        Ok(payload) => RequestOutcome::Success(payload),
        Err(e) => RequestOutcome::Failure(RequestFailure::Malformed(e.to_string())),
    }
}

fn error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Null => None,
        // FastAPI validation errors arrive as a list of objects
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = br#"{"answer":"Revenue was $100B","query_type":"numeric",
            "confidence":"high","sources":[]}"#;
        let outcome: RequestOutcome<QueryPayload> = decode_response(200, body);
        let payload = outcome.into_result().unwrap();
        assert_eq!(payload.answer, "Revenue was $100B");
        assert_eq!(payload.query_type.as_deref(), Some("numeric"));
    }

    #[test]
    fn test_decode_server_detail_verbatim() {
        let outcome: RequestOutcome<IngestPayload> =
            decode_response(400, br#"{"detail":"Unknown ticker"}"#);
        let failure = outcome.into_result().unwrap_err();
        assert_eq!(
            failure,
            RequestFailure::Server {
                status: 400,
                detail: Some("Unknown ticker".to_string())
            }
        );
        assert_eq!(failure.to_string(), "Unknown ticker");
        assert!(!failure.is_transport());
    }

    #[test]
    fn test_decode_server_without_detail() {
        let outcome: RequestOutcome<IngestPayload> =
            decode_response(502, b"<html>Bad Gateway</html>");
        let failure = outcome.into_result().unwrap_err();
        assert_eq!(failure.detail(), None);
        assert_eq!(failure.to_string(), "server returned HTTP 502");
    }

    #[test]
    fn test_decode_validation_error_list() {
        let body = br#"{"detail":[{"loc":["body","ticker"],"msg":"field required"}]}"#;
        let outcome: RequestOutcome<QueryPayload> = decode_response(422, body);
        let failure = outcome.into_result().unwrap_err();
        assert!(failure.detail().unwrap().contains("field required"));
    }

    #[test]
    fn test_decode_malformed_success_body() {
        let outcome: RequestOutcome<QueryPayload> = decode_response(200, b"not json");
        let failure = outcome.into_result().unwrap_err();
        assert!(matches!(failure, RequestFailure::Malformed(_)));
        assert!(failure.is_transport());
    }

    #[test]
    fn test_ingest_payload_tolerates_missing_fields() {
        let outcome: RequestOutcome<IngestPayload> =
            decode_response(201, br#"{"status":"success"}"#);
        let payload = outcome.into_result().unwrap();
        assert_eq!(payload.status.as_deref(), Some("success"));
        assert_eq!(payload.summary(), "");
    }

    #[test]
    fn test_ingest_summary() {
        let payload = IngestPayload {
            company: Some("Apple Inc.".to_string()),
            statements: Some(12),
            chunks: Some(40),
            calculated_ratios: Some(0),
            ..Default::default()
        };
        assert_eq!(payload.summary(), "Apple Inc. · 12 statements · 40 chunks");
    }

    #[test]
    fn test_query_caption() {
        let mut payload = QueryPayload {
            answer: String::new(),
            query_type: None,
            confidence: None,
            sources: vec![],
        };
        assert_eq!(payload.caption(), None);
        payload.query_type = Some("trend".to_string());
        assert_eq!(payload.caption().as_deref(), Some("trend query"));
        payload.confidence = Some("low".to_string());
        assert_eq!(payload.caption().as_deref(), Some("trend query · low confidence"));
    }

    #[test]
    fn test_unreachable_display() {
        let failure = RequestFailure::Unreachable("connection refused".to_string());
        assert!(failure.is_transport());
        assert!(failure.to_string().contains("could not reach server"));
    }
}
