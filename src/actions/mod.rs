//! Closed action vocabulary shared with the executor service.
//!
//! An [`Action`] is the only shape of instruction this crate ever sends to the
//! executor. The three variants and their parameter key names are a wire
//! contract: `type` is one of [`ActionKind::ALL`], `params` carries exactly the
//! keys listed on each variant, and budgets are integers in cents.
//!
//! Untrusted reasoning-engine output enters as raw JSON and only becomes an
//! [`Action`] through [`validator::ActionValidator`].

pub mod validator;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use validator::{validate, ActionValidator, InvalidPlanError};

/// Upper bound for `daily_budget` in cents (100 USD), inclusive.
pub const DEFAULT_MAX_DAILY_BUDGET_CENTS: i64 = 10_000;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// The recognized action type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Read back the current status of a campaign.
    GetCampaignStatus,
    /// Pause a campaign.
    PauseCampaign,
    /// Set the daily budget of an ad set.
    UpdateAdSetDailyBudget,
}

impl ActionKind {
    /// Every recognized kind, in wire-name order.
    pub const ALL: [ActionKind; 3] = [
        Self::GetCampaignStatus,
        Self::PauseCampaign,
        Self::UpdateAdSetDailyBudget,
    ];

    /// The exact `type` string the executor expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetCampaignStatus => "GetCampaignStatus",
            Self::PauseCampaign => "PauseCampaign",
            Self::UpdateAdSetDailyBudget => "UpdateAdSetDailyBudget",
        }
    }

    /// Parse a wire `type` string. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GetCampaignStatus" => Some(Self::GetCampaignStatus),
            "PauseCampaign" => Some(Self::PauseCampaign),
            "UpdateAdSetDailyBudget" => Some(Self::UpdateAdSetDailyBudget),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Campaign status value forced onto every pause action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// The only status this crate ever sets.
    #[serde(rename = "PAUSED")]
    Paused,
}

/// A validated operation instruction.
///
/// Serializes as `{"type": "<ActionKind>", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    /// Status query for one campaign.
    GetCampaignStatus {
        /// Platform campaign identifier.
        campaign_id: String,
    },
    /// Pause one campaign.
    PauseCampaign {
        /// Platform campaign identifier.
        campaign_id: String,
        /// Always [`CampaignStatus::Paused`].
        status: CampaignStatus,
    },
    /// Replace an ad set's daily budget.
    UpdateAdSetDailyBudget {
        /// Platform ad-set identifier.
        adset_id: String,
        /// New daily budget in cents.
        daily_budget: i64,
    },
}

impl Action {
    /// The kind tag of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::GetCampaignStatus { .. } => ActionKind::GetCampaignStatus,
            Self::PauseCampaign { .. } => ActionKind::PauseCampaign,
            Self::UpdateAdSetDailyBudget { .. } => ActionKind::UpdateAdSetDailyBudget,
        }
    }

    /// The `params` object exactly as it goes over the wire.
    pub fn params(&self) -> Value {
        match self {
            Self::GetCampaignStatus { campaign_id } => json!({ "campaign_id": campaign_id }),
            Self::PauseCampaign {
                campaign_id,
                status,
            } => json!({ "campaign_id": campaign_id, "status": status }),
            Self::UpdateAdSetDailyBudget {
                adset_id,
                daily_budget,
            } => json!({ "adset_id": adset_id, "daily_budget": daily_budget }),
        }
    }
}
