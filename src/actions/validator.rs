//! Normalization and rejection of raw proposed actions.
//!
//! Reasoning-engine output is untrusted. Every entry is checked here against
//! the closed vocabulary and numeric bounds before anything else sees it:
//!
//! - entries that are not objects, or whose `type` is not allowed, are dropped
//! - a recognized entry that breaks its parameter contract aborts the batch
//! - an empty surviving list is an error, never an empty success

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Action, ActionKind, CampaignStatus, DEFAULT_MAX_DAILY_BUDGET_CENTS};

/// Why a proposed action list was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidPlanError {
    /// Nothing survived validation.
    #[error("no valid actions")]
    NoValidActions,

    /// A recognized action lacks a required identifier.
    #[error("{action}: {param} required")]
    MissingParam {
        /// The offending action type.
        action: ActionKind,
        /// The missing parameter key.
        param: &'static str,
    },

    /// `daily_budget` could not be coerced to a finite number.
    #[error("{action}: daily_budget int cents required (adset {adset_id})")]
    InvalidBudget {
        /// The offending action type.
        action: ActionKind,
        /// Ad set the budget was proposed for.
        adset_id: String,
    },

    /// `daily_budget` is above the configured ceiling.
    #[error("daily_budget {value} > {limit} not allowed (adset {adset_id})")]
    BudgetAboveLimit {
        /// Ad set the budget was proposed for.
        adset_id: String,
        /// Rounded proposed value in cents.
        value: f64,
        /// Inclusive ceiling in cents.
        limit: i64,
    },
}

/// Validates raw action lists against an allowed subset of [`ActionKind`]
/// and a daily budget ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionValidator {
    allowed: BTreeSet<ActionKind>,
    max_daily_budget_cents: i64,
}

impl Default for ActionValidator {
    fn default() -> Self {
        Self::new(ActionKind::ALL, DEFAULT_MAX_DAILY_BUDGET_CENTS)
    }
}

impl ActionValidator {
    /// Create a validator accepting only `allowed` kinds.
    ///
    /// The allowed set can only narrow [`ActionKind::ALL`]; a kind outside it
    /// is unrepresentable.
    pub fn new(allowed: impl IntoIterator<Item = ActionKind>, max_daily_budget_cents: i64) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            max_daily_budget_cents,
        }
    }

    /// Inclusive daily budget ceiling in cents.
    pub fn max_daily_budget_cents(&self) -> i64 {
        self.max_daily_budget_cents
    }

    /// Whether `kind` is accepted by this validator.
    pub fn allows(&self, kind: ActionKind) -> bool {
        self.allowed.contains(&kind)
    }

    /// Normalize `raw` into typed actions, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPlanError`] if a recognized action is malformed or if
    /// no action survives.
    pub fn validate(&self, raw: &[Value]) -> Result<Vec<Action>, InvalidPlanError> {
        let mut cleaned = Vec::with_capacity(raw.len());

        for entry in raw {
            let Some(obj) = entry.as_object() else {
                debug!("dropping non-object action entry");
                continue;
            };
            let type_name = obj.get("type").and_then(Value::as_str).unwrap_or_default();
            let Some(kind) = ActionKind::parse(type_name).filter(|k| self.allows(*k)) else {
                debug!(action_type = type_name, "dropping unrecognized action type");
                continue;
            };

            let empty = Map::new();
            let params = obj
                .get("params")
                .and_then(Value::as_object)
                .unwrap_or(&empty);

            cleaned.push(self.normalize(kind, params)?);
        }

        if cleaned.is_empty() {
            return Err(InvalidPlanError::NoValidActions);
        }
        Ok(cleaned)
    }

    fn normalize(
        &self,
        kind: ActionKind,
        params: &Map<String, Value>,
    ) -> Result<Action, InvalidPlanError> {
        match kind {
            ActionKind::GetCampaignStatus => Ok(Action::GetCampaignStatus {
                campaign_id: required_id(params, kind, "campaign_id")?,
            }),
            ActionKind::PauseCampaign => Ok(Action::PauseCampaign {
                campaign_id: required_id(params, kind, "campaign_id")?,
                status: CampaignStatus::Paused,
            }),
            ActionKind::UpdateAdSetDailyBudget => {
                let adset_id = required_id(params, kind, "adset_id")?;
                let daily_budget = self.budget_cents(kind, &adset_id, params.get("daily_budget"))?;
                Ok(Action::UpdateAdSetDailyBudget {
                    adset_id,
                    daily_budget,
                })
            }
        }
    }

    fn budget_cents(
        &self,
        action: ActionKind,
        adset_id: &str,
        value: Option<&Value>,
    ) -> Result<i64, InvalidPlanError> {
        let rounded = coerce_number(value)
            .map(f64::round)
            .ok_or_else(|| InvalidPlanError::InvalidBudget {
                action,
                adset_id: adset_id.to_owned(),
            })?;

        #[allow(clippy::cast_precision_loss)]
        let limit = self.max_daily_budget_cents as f64;
        if rounded > limit {
            return Err(InvalidPlanError::BudgetAboveLimit {
                adset_id: adset_id.to_owned(),
                value: rounded,
                limit: self.max_daily_budget_cents,
            });
        }

        // Bounded above by the limit; `as` saturates below.
        #[allow(clippy::cast_possible_truncation)]
        let cents = rounded as i64;
        Ok(cents)
    }
}

/// Validate with the default vocabulary and ceiling.
///
/// # Errors
///
/// See [`ActionValidator::validate`].
pub fn validate(raw: &[Value]) -> Result<Vec<Action>, InvalidPlanError> {
    ActionValidator::default().validate(raw)
}

/// Read a non-empty identifier. Numeric ids are accepted and kept as their
/// decimal text; zero, blank strings, and other JSON types count as missing.
fn required_id(
    params: &Map<String, Value>,
    action: ActionKind,
    param: &'static str,
) -> Result<String, InvalidPlanError> {
    match params.get(param) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|f| f != 0.0) => Ok(n.to_string()),
        _ => Err(InvalidPlanError::MissingParam { action, param }),
    }
}

/// Coerce a JSON number or numeric string to a finite `f64`.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
