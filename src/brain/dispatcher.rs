//! Single-shot submission of validated actions to the executor.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::actions::Action;
use crate::executor::{ActionBatch, BatchAccount, Executor};
use crate::http::sanitize_error_body;

use super::DispatchError;

/// Default `source` tag sent with every batch.
pub const DEFAULT_SOURCE: &str = "n8n";

/// Sends one batch per call; never retries.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn Executor>,
    source: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// A dispatcher submitting to `executor` under the `source` tag.
    pub fn new(executor: Arc<dyn Executor>, source: impl Into<String>) -> Self {
        Self {
            executor,
            source: source.into(),
        }
    }

    /// Submit `actions` for `user_account_id` under `idempotency_key`.
    ///
    /// Returns the executor's reply parsed as JSON (or `{"raw": body}`).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Rejected`] for a non-success status and
    /// [`DispatchError::Transport`] when no reply arrived.
    pub async fn dispatch(
        &self,
        idempotency_key: &str,
        user_account_id: &str,
        actions: &[Action],
    ) -> Result<Value, DispatchError> {
        let batch = ActionBatch {
            idempotency_key: idempotency_key.to_owned(),
            source: self.source.clone(),
            account: BatchAccount {
                user_account_id: user_account_id.to_owned(),
            },
            actions: actions.to_vec(),
        };

        let reply = self.executor.submit(&batch).await?;
        if !reply.is_success() {
            warn!(
                idempotency_key,
                status = reply.status,
                "executor rejected action batch"
            );
            return Err(DispatchError::Rejected {
                status: reply.status,
                body: sanitize_error_body(&reply.body),
            });
        }

        info!(
            idempotency_key,
            status = reply.status,
            actions = actions.len(),
            "action batch accepted"
        );
        Ok(reply.json())
    }
}
