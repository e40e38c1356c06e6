//! Account store, report history, and run archival.
//!
//! The pipeline depends only on the three capability traits below;
//! [`SqliteStore`] implements all of them over one `sqlx` pool.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::Action;

pub use sqlite::{SqliteStore, StoredExecution};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A managed ad account and its credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Internal account identifier.
    pub id: String,
    /// Platform ad-account id (e.g. `act_123`).
    pub ad_account_id: String,
    /// Platform access token.
    pub access_token: String,
    /// Platform page id.
    pub page_id: Option<String>,
    /// Telegram chat id used for reports and report history.
    pub telegram_id: Option<String>,
    /// Per-account Telegram bot token.
    pub telegram_bot_token: Option<String>,
    /// Display name.
    pub username: Option<String>,
    /// Client-specific prompt fragment prepended to the operating policy.
    pub policy_prompt: Option<String>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("ad_account_id", &self.ad_account_id)
            .field("access_token", &"[REDACTED]")
            .field("page_id", &self.page_id)
            .field("telegram_id", &self.telegram_id)
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A previously archived report as returned by history lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Archived payload; either a string or an object with a `text` field.
    pub report_data: Value,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

impl ReportRecord {
    /// The human-readable text of this report.
    pub fn text(&self) -> String {
        match &self.report_data {
            Value::String(s) => s.clone(),
            Value::Object(obj) => match obj.get("text").and_then(Value::as_str) {
                Some(text) => text.to_owned(),
                None => self.report_data.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// A rendered report to archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedReport {
    /// Rendered text.
    pub text: String,
    /// Report date (`YYYY-MM-DD`).
    pub date: String,
    /// Advisory note from the plan.
    pub plan_note: Option<String>,
    /// Validated actions of the run.
    pub actions: Vec<Action>,
}

/// Final status of an archived run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The run reached REPORTING.
    Success,
}

impl ExecutionStatus {
    /// The string stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
        }
    }
}

/// Complete record of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    /// Internal account identifier.
    pub user_account_id: String,
    /// Idempotency key of the run.
    pub idempotency_key: String,
    /// The plan as received (`planNote` + raw `actions`).
    pub plan: Value,
    /// Validated actions.
    pub actions: Vec<Action>,
    /// Parsed executor reply, when dispatched.
    pub executor_response: Option<Value>,
    /// Rendered report.
    pub report_text: String,
    /// Final status.
    pub status: ExecutionStatus,
    /// Wall-clock duration of the run.
    pub duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No account with the given id exists.
    #[error("account not found: {0}")]
    AccountNotFound(String),
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Lookup of managed accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AccountNotFound`] if absent.
    async fn get_account(&self, id: &str) -> Result<Account, StoreError>;
}

/// Lookup of prior reports for a messaging identity.
#[async_trait]
pub trait ReportHistoryStore: Send + Sync {
    /// Up to `limit` reports for `identity`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    async fn recent_reports(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, StoreError>;
}

/// Best-effort archival of run output.
#[async_trait]
pub trait RunArchive: Send + Sync {
    /// Archive a rendered report under `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    async fn save_report(&self, identity: &str, report: &ArchivedReport)
        -> Result<(), StoreError>;

    /// Archive a full execution record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError>;
}
