//! Executor service client.
//!
//! The executor applies validated actions to the ads platform verbatim and
//! owns de-duplication by idempotency key. This module only carries the batch
//! there and hands back the raw reply; deciding what a non-success status
//! means is the dispatcher's job.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;

use crate::actions::Action;

pub use self::http::HttpExecutor;

/// Account reference inside an [`ActionBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAccount {
    /// Internal account identifier (not the ad-account id).
    pub user_account_id: String,
}

/// Request body sent to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBatch {
    /// De-duplication token for this run.
    pub idempotency_key: String,
    /// Caller tag expected by the executor.
    pub source: String,
    /// Target account.
    pub account: BatchAccount,
    /// Validated actions, in plan order.
    pub actions: Vec<Action>,
}

/// Raw executor reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorReply {
    /// HTTP status code.
    pub status: u16,
    /// Unparsed body text.
    pub body: String,
}

impl ExecutorReply {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON, or `{"raw": body}` when it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        crate::http::json_or_raw(&self.body)
    }
}

/// Transport-level executor failures.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// HTTP transport failure (including timeouts).
    #[error("executor request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// No executor endpoint is configured.
    #[error("executor is not configured")]
    NotConfigured,
}

/// Submits action batches to the executor.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Send `batch` once and return whatever came back.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] only when no reply was received.
    async fn submit(&self, batch: &ActionBatch) -> Result<ExecutorReply, ExecutorError>;
}
