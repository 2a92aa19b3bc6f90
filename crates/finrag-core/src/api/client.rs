use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    decode_response, Backend, HealthStatus, IngestPayload, IngestRequest, QueryPayload,
    QueryRequest, RequestFailure, RequestOutcome, HEALTH_PATH, INGEST_PATH, QUERY_PATH,
};

/// `reqwest`-backed client for the Q&A backend
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> RequestOutcome<T> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(path, error = %e, "request failed before a response arrived");
                return RequestOutcome::Failure(RequestFailure::Unreachable(e.to_string()));
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(path, %status, error = %e, "connection dropped while reading response");
                return RequestOutcome::Failure(RequestFailure::Unreachable(e.to_string()));
            }
        };

        debug!(path, %status, bytes = body.len(), "response received");
        decode_response(status.as_u16(), &body)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn ingest(&self, ticker: &str) -> RequestOutcome<IngestPayload> {
        let request = self
            .client
            .post(self.endpoint(INGEST_PATH))
            .json(&IngestRequest { ticker });
        self.send(request, INGEST_PATH).await
    }

    async fn query(&self, ticker: &str, question: &str) -> RequestOutcome<QueryPayload> {
        let request = self
            .client
            .post(self.endpoint(QUERY_PATH))
            .json(&QueryRequest { query: question, ticker });
        self.send(request, QUERY_PATH).await
    }

    async fn health(&self) -> RequestOutcome<HealthStatus> {
        let request = self.client.get(self.endpoint(HEALTH_PATH));
        self.send(request, HEALTH_PATH).await
    }
}
