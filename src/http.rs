//! Shared outbound HTTP plumbing: client construction with timeouts and
//! sanitization of error bodies before they are carried in an error.

use std::time::Duration;

use regex::Regex;
use tracing::warn;

/// Longest error body kept in an error value.
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Connect and total-request timeouts for one outbound client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// TCP/TLS connect timeout.
    pub connect: Duration,
    /// Whole-request timeout, including reading the body.
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(30),
        }
    }
}

/// Build a `reqwest` client honoring `timeouts`.
///
/// Falls back to a default client (logged) if the builder fails.
pub fn build_client(timeouts: HttpTimeouts) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client with timeouts, using default");
            reqwest::Client::default()
        })
}

/// Read a response into its status code and raw body text.
///
/// # Errors
///
/// Returns the transport error if the body cannot be read.
pub async fn read_response(response: reqwest::Response) -> Result<(u16, String), reqwest::Error> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

/// Parse `body` as JSON, wrapping non-JSON text as `{"raw": body}`.
pub fn json_or_raw(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::json!({ "raw": body }))
}

/// Collapse whitespace, redact token-like values, and truncate.
pub fn sanitize_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-[A-Za-z0-9_\-]{20,}",
        r"EAA[A-Za-z0-9]{20,}",
        r"access_token=[^&\s]+",
        r"bot[0-9]{6,}:[A-Za-z0-9_\-]{20,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
