//! Route handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::actions::Action;
use crate::brain::{DecideRequest, RunOutcome, RunRequest};

use super::{AppError, AppState};

const ACCOUNT_REQUIRED: &str = "userAccountId required";

/// `POST /api/brain/run` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunBody {
    /// Caller-supplied idempotency key.
    pub idempotency_key: Option<String>,
    /// Internal account identifier.
    pub user_account_id: Option<String>,
    /// Run options.
    pub inputs: Option<RunInputs>,
}

/// Options inside [`RunBody`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RunInputs {
    /// Send validated actions to the executor.
    pub dispatch: bool,
}

/// `POST /api/brain/decide` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecideBody {
    /// Accepted for compatibility; plan-only requests never dispatch.
    pub idempotency_key: Option<String>,
    /// Internal account identifier.
    pub user_account_id: Option<String>,
    /// Free-form goal.
    pub goal: Option<Value>,
    /// Free-form inputs; `client_prompt` is the prompt fragment.
    pub inputs: Option<Value>,
}

/// `POST /api/brain/decide` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideResponse {
    /// Advisory note from the plan.
    pub plan_note: Option<String>,
    /// Validated actions.
    pub actions: Vec<Action>,
    /// Always `false`.
    pub dispatched: bool,
}

fn required_account(id: Option<String>) -> Result<String, AppError> {
    id.filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(ACCOUNT_REQUIRED.to_owned()))
}

/// Run the full pipeline.
///
/// # Errors
///
/// Returns [`AppError`] for a missing account id or a fatal run failure.
pub async fn run(
    State(state): State<AppState>,
    Json(body): Json<RunBody>,
) -> Result<Json<RunOutcome>, AppError> {
    let account_id = required_account(body.user_account_id)?;
    let outcome = state
        .orchestrator
        .run(RunRequest {
            idempotency_key: body.idempotency_key,
            account_id,
            dispatch: body.inputs.is_some_and(|i| i.dispatch),
        })
        .await?;
    Ok(Json(outcome))
}

/// Produce a plan without fetching or dispatching.
///
/// # Errors
///
/// Returns [`AppError`] for a missing account id or a planning failure.
pub async fn decide(
    State(state): State<AppState>,
    Json(body): Json<DecideBody>,
) -> Result<Json<DecideResponse>, AppError> {
    required_account(body.user_account_id)?;
    let decision = state
        .orchestrator
        .decide(&DecideRequest {
            goal: body.goal,
            inputs: body.inputs,
        })
        .await?;
    Ok(Json(DecideResponse {
        plan_note: decision.plan_note,
        actions: decision.actions,
        dispatched: false,
    }))
}

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
