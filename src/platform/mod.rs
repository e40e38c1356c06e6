//! Ads-platform data source: account status, ad sets, and yesterday's
//! ad-level insights.
//!
//! Results are kept as raw JSON; the pipeline only reads a handful of fields
//! (`account_status`, `disable_reason`, `id`, `data`, `date_start`) and passes
//! the rest to the reasoning engine untouched.

pub mod graph;

use async_trait::async_trait;
use serde_json::Value;

pub use graph::GraphApiClient;

/// A failed upstream read. Never fatal to a run: the orchestrator converts
/// it into an inline `{"error": "..."}` placeholder.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// Transport failure or timeout. The URL is stripped because it carries
    /// the access token.
    #[error("platform request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The platform answered with a non-success status.
    #[error("platform returned {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// The request URL could not be built.
    #[error("invalid platform url: {0}")]
    InvalidUrl(String),
}

/// Read-only access to one ad account's state and metrics.
#[async_trait]
pub trait PlatformDataSource: Send + Sync {
    /// Account status fields (`account_status`, `disable_reason`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] on transport or status failure.
    async fn account_status(
        &self,
        ad_account_id: &str,
        access_token: &str,
    ) -> Result<Value, PlatformError>;

    /// Ad sets with `id`, `name`, `daily_budget`, wrapped in `{"data": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] on transport or status failure.
    async fn adsets(&self, ad_account_id: &str, access_token: &str)
        -> Result<Value, PlatformError>;

    /// Yesterday's ad-level insights, wrapped in `{"data": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] on transport or status failure.
    async fn yesterday_insights(
        &self,
        ad_account_id: &str,
        access_token: &str,
    ) -> Result<Value, PlatformError>;
}
