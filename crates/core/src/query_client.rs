use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::connection::ConnectionStatus;
use crate::response::QueryOutcome;

pub const QUERY_PARAM: &str = "q";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn get(&self, endpoint: &str, query: Option<&str>)
        -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct QueryClient<T> {
    transport: T,
    endpoint: String,
}

impl<T: QueryTransport> QueryClient<T> {
    #[must_use]
    pub fn new(transport: T, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn execute(&self, query: &str) -> Result<QueryOutcome, TransportError> {
        let response = self.transport.get(&self.endpoint, Some(query)).await?;
        debug!(
            status = response.status,
            bytes = response.body.len(),
            "query response received"
        );
        Ok(QueryOutcome::from_body(response.status, response.body))
    }

    pub async fn probe(&self) -> ConnectionStatus {
        let response = self.transport.get(&self.endpoint, None).await;
        ConnectionStatus::from_probe(response.as_ref().map(|response| response.status))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{HttpResponse, QueryClient, QueryTransport, TransportError};
    use crate::connection::ConnectionStatus;
    use crate::response::ResponseShape;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct RecordedRequest {
        pub endpoint: String,
        pub query: Option<String>,
    }

    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedTransport {
        responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
        pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            responses: impl IntoIterator<Item = Result<HttpResponse, TransportError>>,
        ) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into_iter().collect())),
                requests: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl QueryTransport for ScriptedTransport {
        async fn get(
            &self,
            endpoint: &str,
            query: Option<&str>,
        ) -> Result<HttpResponse, TransportError> {
            self.requests
                .lock()
                .expect("requests lock poisoned")
                .push(RecordedRequest {
                    endpoint: endpoint.to_string(),
                    query: query.map(str::to_string),
                });
            self.responses
                .lock()
                .expect("responses lock poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no scripted response")))
        }
    }

    #[tokio::test]
    async fn execute_forwards_query_verbatim_and_classifies_body() {
        let transport = ScriptedTransport::new([Ok(HttpResponse::new(200, r#"[{"a":1}]"#))]);
        let client = QueryClient::new(transport.clone(), "http://db.local/db");

        let outcome = client
            .execute("select *\n  from t")
            .await
            .expect("query should succeed");

        assert_eq!(outcome.shape(), ResponseShape::TabularRows);
        assert_eq!(outcome.raw, r#"[{"a":1}]"#);
        let requests = transport.requests.lock().expect("lock").clone();
        assert_eq!(requests[0].endpoint, "http://db.local/db");
        assert_eq!(requests[0].query.as_deref(), Some("select *\n  from t"));
    }

    #[tokio::test]
    async fn error_status_bodies_are_still_classified() {
        let transport = ScriptedTransport::new([Ok(HttpResponse::new(500, "boom"))]);
        let client = QueryClient::new(transport, "http://db.local/db");

        let outcome = client.execute("select 1").await.expect("a response arrived");
        assert_eq!(outcome.status, 500);
        assert_eq!(outcome.shape(), ResponseShape::Text);
    }

    #[tokio::test]
    async fn transport_failures_are_returned_without_retry() {
        let transport = ScriptedTransport::new([
            Err(TransportError::new("connection refused")),
            Ok(HttpResponse::new(200, "[]")),
        ]);
        let client = QueryClient::new(transport.clone(), "http://db.local/db");

        let error = client.execute("select 1").await.expect_err("should fail");
        assert_eq!(error.message(), "connection refused");
        assert_eq!(transport.requests.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn probe_sends_bare_request_and_classifies_status() {
        let transport = ScriptedTransport::new([
            Ok(HttpResponse::new(200, "")),
            Ok(HttpResponse::new(503, "")),
            Err(TransportError::new("dns")),
        ]);
        let client = QueryClient::new(transport.clone(), "http://db.local/db");

        assert_eq!(client.probe().await, ConnectionStatus::Connected);
        assert_eq!(client.probe().await, ConnectionStatus::ServerError);
        assert_eq!(client.probe().await, ConnectionStatus::Disconnected);
        let requests = transport.requests.lock().expect("lock").clone();
        assert!(requests.iter().all(|request| request.query.is_none()));
    }
}
