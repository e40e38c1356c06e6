//! The plan-validate-dispatch pipeline.
//!
//! [`Orchestrator`] sequences one run per request:
//! FETCHING, PLANNING, VALIDATING, optionally DISPATCHING, then REPORTING.
//! Only FETCHING tolerates partial failure; every later stage either
//! succeeds or aborts the run with a [`RunError`].

pub mod context;
pub mod dispatcher;
pub mod idempotency;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod report;

use std::fmt;

use crate::actions::InvalidPlanError;
use crate::executor::ExecutorError;
use crate::providers::ProviderError;
use crate::store::StoreError;

pub use context::{DecisionPayload, Defaults, FetchResult, UpstreamSnapshot};
pub use dispatcher::Dispatcher;
pub use orchestrator::{
    Collaborators, DecideRequest, Decision, Orchestrator, RunOutcome, RunRequest, RunSettings,
};
pub use planner::{Plan, PlanSource, Planner};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// Account lookup and concurrent upstream reads.
    Fetching,
    /// Reasoning-engine call and reply parsing.
    Planning,
    /// Action validation.
    Validating,
    /// Executor submission.
    Dispatching,
    /// Report rendering, archival, and delivery.
    Reporting,
}

impl RunStage {
    /// Lowercase stage name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Planning => "planning",
            Self::Validating => "validating",
            Self::Dispatching => "dispatching",
            Self::Reporting => "reporting",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The reasoning engine's reply could not be read as a plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanParseError {
    /// Neither the whole reply nor any embedded object parsed as JSON.
    #[error("reply contains no JSON object")]
    NoJsonObject,
    /// The reply parsed, but not to an object.
    #[error("plan is not a JSON object")]
    NotAnObject,
    /// The plan object has no `actions` list.
    #[error("plan has no `actions` list")]
    ActionsNotList,
}

/// Failure while obtaining a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanRequestError {
    /// The reasoning engine call failed.
    #[error(transparent)]
    Reasoning(#[from] ProviderError),
    /// The reply was not a usable plan.
    #[error(transparent)]
    Parse(#[from] PlanParseError),
}

/// The executor did not accept the batch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The executor answered with a non-success status.
    #[error("executor returned {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// No reply was received.
    #[error(transparent)]
    Transport(#[from] ExecutorError),
}

/// A fatal run failure, surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The account does not exist.
    #[error("account not found: {0}")]
    AccountNotFound(String),
    /// The account store failed.
    #[error("account lookup failed: {0}")]
    Store(StoreError),
    /// The reasoning engine call failed.
    #[error("reasoning engine failed: {0}")]
    Reasoning(ProviderError),
    /// The reasoning reply was not a plan.
    #[error("could not parse plan: {0}")]
    PlanParse(PlanParseError),
    /// Validation rejected the plan.
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] InvalidPlanError),
    /// Dispatch to the executor failed.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl RunError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::Store(_) => "account_lookup_failed",
            Self::Reasoning(_) => "reasoning_failed",
            Self::PlanParse(_) => "plan_parse_failed",
            Self::InvalidPlan(_) => "invalid_plan",
            Self::Dispatch(_) => "dispatch_failed",
        }
    }

    /// The stage at which the run failed.
    pub fn stage(&self) -> RunStage {
        match self {
            Self::AccountNotFound(_) | Self::Store(_) => RunStage::Fetching,
            Self::Reasoning(_) | Self::PlanParse(_) => RunStage::Planning,
            Self::InvalidPlan(_) => RunStage::Validating,
            Self::Dispatch(_) => RunStage::Dispatching,
        }
    }
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => Self::AccountNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<PlanRequestError> for RunError {
    fn from(err: PlanRequestError) -> Self {
        match err {
            PlanRequestError::Reasoning(e) => Self::Reasoning(e),
            PlanRequestError::Parse(e) => Self::PlanParse(e),
        }
    }
}
