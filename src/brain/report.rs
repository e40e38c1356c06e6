//! Report rendering. Pure: identical inputs give byte-identical text.

use serde_json::Value;

use crate::actions::Action;
use crate::store::ReportRecord;

/// Prior reports included in the history section.
pub const HISTORY_IN_REPORT: usize = 3;

const PLACEHOLDER: &str = "n/a";

/// Render the daily report.
///
/// `executed` holds the actions actually dispatched in this run; an empty
/// slice renders the "no action required" line.
pub fn build(
    date: &str,
    account_status: &Value,
    executed: &[Action],
    history: &[ReportRecord],
) -> String {
    let mut lines = vec![
        format!("Report for {date}"),
        String::new(),
        format!("Account status: {}", status_line(account_status)),
        String::new(),
        "Executed actions:".to_owned(),
    ];

    if executed.is_empty() {
        lines.push("No optimization action required".to_owned());
    } else {
        for (n, action) in (1_usize..).zip(executed) {
            lines.push(format!("{n}. {} - {}", action.kind(), action.params()));
        }
    }

    lines.push(String::new());
    lines.push(format!("Analytics (last {HISTORY_IN_REPORT} reports):"));
    if history.is_empty() {
        lines.push(PLACEHOLDER.to_owned());
    } else {
        let sections: Vec<String> = (1_usize..)
            .zip(history.iter().take(HISTORY_IN_REPORT))
            .map(|(n, record)| format!("Report {n}:\n{}", record.text()))
            .collect();
        lines.push(sections.join("\n\n"));
    }

    lines.join("\n")
}

fn status_line(status: &Value) -> String {
    let active = status.get("account_status").and_then(Value::as_i64) == Some(1);
    if active {
        let id = status
            .get("id")
            .map_or_else(|| PLACEHOLDER.to_owned(), display_scalar);
        format!("active (ID: {id})")
    } else {
        let reason = status
            .get("disable_reason")
            .filter(|v| !v.is_null())
            .map_or_else(|| PLACEHOLDER.to_owned(), display_scalar);
        format!("inactive (reason: {reason})")
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
