use std::io::Read;

use async_trait::async_trait;
use dbx_core::query_client::{HttpResponse, QueryTransport, TransportError, QUERY_PARAM};
use tracing::debug;

/// Blocking `ureq` agent driven from tokio's blocking pool so a slow
/// endpoint never stalls the caller's runtime.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryTransport for UreqTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let endpoint = endpoint.to_string();
        let query = query.map(str::to_string);

        tokio::task::spawn_blocking(move || blocking_get(&agent, &endpoint, query.as_deref()))
            .await
            .map_err(|error| TransportError::new(format!("request task failed: {error}")))?
    }
}

fn blocking_get(
    agent: &ureq::Agent,
    endpoint: &str,
    query: Option<&str>,
) -> Result<HttpResponse, TransportError> {
    let mut request = agent.get(endpoint);
    if let Some(query) = query {
        request = request.query(QUERY_PARAM, query);
    }

    // Error statuses still carry a body worth classifying.
    let response = match request.call() {
        Ok(response) | Err(ureq::Error::Status(_, response)) => response,
        Err(error) => return Err(TransportError::new(error.to_string())),
    };

    let status = response.status();
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|error| TransportError::new(format!("failed to read response body: {error}")))?;
    debug!(status, bytes = bytes.len(), endpoint, "http response");

    Ok(HttpResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
