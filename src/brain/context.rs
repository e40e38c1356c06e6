//! Context assembly: merges account state, platform reads, and report
//! history into the [`DecisionPayload`] handed to the reasoning engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::platform::PlatformError;
use crate::store::ReportRecord;

/// Outcome of one upstream platform read.
pub type FetchResult = Result<Value, PlatformError>;

/// Numeric defaults the reasoning engine falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Target cost per lead, in cents.
    pub target_cpl_cents: i64,
    /// Daily budget assumed for ad sets without one, in cents.
    pub default_daily_budget_cents: i64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            target_cpl_cents: 200,
            default_daily_budget_cents: 2000,
        }
    }
}

/// Upstream reads after fault isolation. A failed read is replaced by an
/// `{"error": "..."}` placeholder; successful reads are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSnapshot {
    /// Account status object or placeholder.
    pub account_status: Value,
    /// Ad-set response (`{"data": [...]}`) or placeholder.
    pub adsets: Value,
    /// Insights response (`{"data": [...]}`) or placeholder.
    pub insights: Value,
}

impl UpstreamSnapshot {
    /// Combine three independent reads, degrading each failure in place.
    pub fn from_results(status: FetchResult, adsets: FetchResult, insights: FetchResult) -> Self {
        Self {
            account_status: or_placeholder("account_status", status),
            adsets: or_placeholder("adsets", adsets),
            insights: or_placeholder("insights", insights),
        }
    }

    /// Report date: the first insights row's `date_start`, else `today`.
    pub fn report_date(&self, today: NaiveDate) -> String {
        self.insights
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|row| row.get("date_start"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map_or_else(|| today.format("%Y-%m-%d").to_string(), str::to_owned)
    }
}

fn or_placeholder(source: &str, result: FetchResult) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(source, error = %e, "upstream fetch failed, using placeholder");
            placeholder(&e.to_string())
        }
    }
}

/// The inline error placeholder for a failed read.
pub fn placeholder(message: &str) -> Value {
    json!({ "error": message })
}

/// Whether `value` is an error placeholder.
pub fn is_placeholder(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.contains_key("error"))
}

/// Read-only snapshot sent to the reasoning engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionPayload {
    /// Internal account identifier.
    #[serde(rename = "userAccountId")]
    pub user_account_id: String,
    /// Account status object or placeholder.
    pub account_status: Value,
    /// Ad-set rows, or a placeholder.
    pub adsets: Value,
    /// Yesterday's ad-level rows, or a placeholder.
    pub yesterday_insights: Value,
    /// Up to three prior reports, most recent first.
    pub last_reports: Vec<ReportRecord>,
    /// Numeric defaults.
    pub defaults: Defaults,
}

/// Build the decision payload. List-shaped reads contribute their `data`
/// array (empty when absent); placeholders pass through unchanged.
pub fn assemble(
    user_account_id: &str,
    upstream: &UpstreamSnapshot,
    last_reports: Vec<ReportRecord>,
    defaults: Defaults,
) -> DecisionPayload {
    DecisionPayload {
        user_account_id: user_account_id.to_owned(),
        account_status: upstream.account_status.clone(),
        adsets: data_rows(&upstream.adsets),
        yesterday_insights: data_rows(&upstream.insights),
        last_reports,
        defaults,
    }
}

fn data_rows(value: &Value) -> Value {
    if is_placeholder(value) {
        return value.clone();
    }
    match value.get("data") {
        Some(rows @ Value::Array(_)) => rows.clone(),
        _ => Value::Array(Vec::new()),
    }
}
