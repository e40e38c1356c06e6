//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::brain::RunError;

/// Error type returned by route handlers.
#[derive(Debug)]
pub enum AppError {
    /// The request body is missing a required field.
    BadRequest(String),
    /// The pipeline failed.
    Run(RunError),
}

impl From<RunError> for AppError {
    fn from(err: RunError) -> Self {
        Self::Run(err)
    }
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Run(err) => match err {
                RunError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                RunError::Reasoning(_) | RunError::Dispatch(_) => StatusCode::BAD_GATEWAY,
                RunError::PlanParse(_) | RunError::InvalidPlan(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                RunError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::BadRequest(msg) => json!({ "error": msg }),
            Self::Run(err) => json!({ "error": err.code(), "details": err.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
