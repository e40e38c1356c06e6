//! Plan requests to the reasoning engine and reply parsing.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};

use super::{PlanParseError, PlanRequestError};

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// A reasoning engine reply.
    Reasoning,
    /// Reasoning is switched off; the plan is empty.
    Disabled,
}

/// An unvalidated proposal: advisory note plus raw candidate actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Free-text note; never validated.
    pub plan_note: Option<String>,
    /// Raw, untrusted action objects.
    pub actions: Vec<Value>,
    /// Origin of the plan.
    pub source: PlanSource,
}

impl Plan {
    /// The empty plan used when reasoning is disabled.
    pub fn disabled() -> Self {
        Self {
            plan_note: None,
            actions: Vec::new(),
            source: PlanSource::Disabled,
        }
    }

    /// The plan as it is archived: `{"planNote": ..., "actions": [...]}`.
    pub fn to_json(&self) -> Value {
        json!({ "planNote": self.plan_note, "actions": self.actions })
    }
}

/// Requests plans from an optional reasoning engine.
#[derive(Clone)]
pub struct Planner {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("model", &self.provider.as_ref().map(|p| p.model_id().to_owned()))
            .finish()
    }
}

impl Planner {
    /// A planner backed by `provider`.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A planner that never calls a reasoning engine.
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    /// Whether plans come from a reasoning engine.
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Send `system` and the JSON-encoded `payload` and parse the reply.
    ///
    /// # Errors
    ///
    /// Returns [`PlanRequestError::Reasoning`] if the call fails and
    /// [`PlanRequestError::Parse`] if the reply is not a plan.
    pub async fn request_plan<T: Serialize + ?Sized>(
        &self,
        system: &str,
        payload: &T,
    ) -> Result<Plan, PlanRequestError> {
        let Some(provider) = &self.provider else {
            debug!("reasoning disabled, returning empty plan");
            return Ok(Plan::disabled());
        };

        let body = serde_json::to_string(payload)
            .map_err(|e| ProviderError::Parse(format!("failed to encode payload: {e}")))?;
        let request = CompletionRequest {
            messages: vec![Message::user(body)],
            system: Some(system.to_owned()),
            max_tokens: None,
            temperature: Some(0.0),
            json_response: true,
        };

        let response = provider.complete(request).await?;
        debug!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "plan reply received"
        );

        parse_plan(&response.text).map_err(|e| {
            warn!(
                error = %e,
                text_preview = preview(&response.text),
                "failed to parse plan reply"
            );
            PlanRequestError::Parse(e)
        })
    }
}

/// Parse a reasoning reply into a [`Plan`].
///
/// The whole reply is tried as JSON first. Otherwise each brace-balanced
/// `{...}` span is tried in order of its opening brace, then the span from
/// the first `{` to the last `}`. The first object carrying an `actions`
/// list wins.
///
/// # Errors
///
/// Returns [`PlanParseError`] if no object parses or none has an `actions`
/// list.
pub fn parse_plan(text: &str) -> Result<Plan, PlanParseError> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return plan_from_value(value);
    }

    let balanced = text
        .match_indices('{')
        .filter_map(|(start, _)| balanced_object(text, start));
    let mut first_error = None;
    for candidate in balanced.chain(greedy_object(text)) {
        let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        match plan_from_value(value) {
            Ok(plan) => return Ok(plan),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(PlanParseError::NoJsonObject))
}

fn plan_from_value(value: Value) -> Result<Plan, PlanParseError> {
    let Value::Object(mut obj) = value else {
        return Err(PlanParseError::NotAnObject);
    };
    let actions = match obj.remove("actions") {
        Some(Value::Array(actions)) => actions,
        _ => return Err(PlanParseError::ActionsNotList),
    };
    let plan_note = match obj.remove("planNote") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    Ok(Plan {
        plan_note,
        actions,
        source: PlanSource::Reasoning,
    })
}

/// The brace-balanced span opening at `start`, skipping braces inside
/// strings.
fn balanced_object(text: &str, start: usize) -> Option<&str> {
    let rest = text.get(start..)?;

    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth = depth.saturating_add(1),
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return rest.get(..=i);
                }
            }
            _ => {}
        }
    }
    None
}

fn greedy_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

fn preview(text: &str) -> &str {
    let mut end = text.len().min(200);
    while !text.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    text.get(..end).unwrap_or_default()
}
