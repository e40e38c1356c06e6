//! HTTP executor: `POST {base}/api/agent/actions`.

use async_trait::async_trait;
use tracing::debug;

use crate::http::{build_client, read_response, HttpTimeouts};

use super::{ActionBatch, Executor, ExecutorError, ExecutorReply};

const ACTIONS_PATH: &str = "/api/agent/actions";

/// Executor reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl HttpExecutor {
    /// Create an executor client for `base_url`. A blank base URL leaves the
    /// executor unconfigured and every submission fails.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Self {
        Self {
            endpoint: actions_endpoint(base_url),
            client: build_client(timeouts),
        }
    }

    /// The resolved actions endpoint, if configured.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

/// Resolve `{base}/api/agent/actions`, trimming trailing slashes from `base`.
pub fn actions_endpoint(base_url: &str) -> Option<String> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    Some(format!("{base}{ACTIONS_PATH}"))
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn submit(&self, batch: &ActionBatch) -> Result<ExecutorReply, ExecutorError> {
        let endpoint = self.endpoint.as_deref().ok_or(ExecutorError::NotConfigured)?;
        debug!(
            idempotency_key = %batch.idempotency_key,
            actions = batch.actions.len(),
            "submitting action batch"
        );

        let response = self
            .client
            .post(endpoint)
            .header("content-type", "application/json")
            .json(batch)
            .send()
            .await?;
        let (status, body) = read_response(response).await?;
        Ok(ExecutorReply { status, body })
    }
}
