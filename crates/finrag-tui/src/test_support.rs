use async_trait::async_trait;
use finrag_core::api::{HealthStatus, IngestPayload, QueryPayload};
use finrag_core::{Backend, RequestFailure, RequestOutcome};

/// Backend that answers every call the same way
pub struct StaticBackend {
    pub ingest: RequestOutcome<IngestPayload>,
    pub answer: RequestOutcome<QueryPayload>,
    pub health: RequestOutcome<HealthStatus>,
}

impl StaticBackend {
    pub fn offline() -> Self {
        let down = RequestFailure::Unreachable("connection refused".to_string());
        Self {
            ingest: RequestOutcome::Failure(down.clone()),
            answer: RequestOutcome::Failure(down.clone()),
            health: RequestOutcome::Failure(down),
        }
    }

    pub fn online(answer: &str) -> Self {
        Self {
            ingest: RequestOutcome::Success(IngestPayload {
                company: Some("Apple Inc.".to_string()),
                statements: Some(12),
                ..Default::default()
            }),
            answer: RequestOutcome::Success(QueryPayload {
                answer: answer.to_string(),
                query_type: Some("numeric".to_string()),
                confidence: None,
                sources: vec![],
            }),
            health: RequestOutcome::Success(HealthStatus {
                status: "ok".to_string(),
                version: "1.0.0".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Backend for StaticBackend {
    async fn ingest(&self, _ticker: &str) -> RequestOutcome<IngestPayload> {
        self.ingest.clone()
    }

    async fn query(&self, _ticker: &str, _question: &str) -> RequestOutcome<QueryPayload> {
        self.answer.clone()
    }

    async fn health(&self) -> RequestOutcome<HealthStatus> {
        self.health.clone()
    }
}
