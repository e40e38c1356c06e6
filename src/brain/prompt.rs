//! System prompt sent with every plan request.

use crate::actions::{ActionKind, ActionValidator};

use super::Defaults;

/// Build the system prompt: the account's own fragment, then the fixed
/// operating policy. Only the kinds `validator` allows are advertised.
pub fn policy_prompt(
    client_fragment: &str,
    defaults: &Defaults,
    validator: &ActionValidator,
) -> String {
    let target_cpl = defaults.target_cpl_cents;
    let daily_budget = defaults.default_daily_budget_cents;
    let ceiling = validator.max_daily_budget_cents();

    let mut lines = vec![
        client_fragment.trim().to_owned(),
        String::new(),
        format!(
            "Role: analyse the input data, produce a list of actions, and hand them to the \
             executor in one batch. Unless targets are given, assume a target CPL of \
             {target_cpl} cents and a daily budget of {daily_budget} cents. Work only with \
             active campaigns. Budget increases and decreases are always 20% of the ad set's \
             current daily budget. Pause a campaign whose CPL has exceeded 500 cents for three \
             consecutive days."
        ),
        String::new(),
        "Rules:".to_owned(),
        "- Budgets are integers in cents; 1 USD = 100. 2000 +20% = 2400, -20% = 1600.".to_owned(),
        "- Change budgets only relative to the ad set's current daily budget.".to_owned(),
        format!("- Never propose a daily_budget above {ceiling}."),
        "- Act only on ACTIVE accounts and campaigns (account_status = 1).".to_owned(),
        "- Compute CPL from onsite_conversion.total_messaging_connection.".to_owned(),
        String::new(),
        "Available actions (exactly these):".to_owned(),
    ];

    for kind in ActionKind::ALL {
        if validator.allows(kind) {
            lines.push(format!("- {kind} {}", param_hint(kind)));
        }
    }

    lines.push(String::new());
    lines.push(
        r#"Reply format: STRICT JSON only: { "planNote": string, "actions": [ { "type": string, "params": { ... } } ] }"#
            .to_owned(),
    );
    lines.join("\n")
}

fn param_hint(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::GetCampaignStatus => r#"{"campaign_id"}"#,
        ActionKind::PauseCampaign => r#"{"campaign_id","status":"PAUSED"}"#,
        ActionKind::UpdateAdSetDailyBudget => r#"{"adset_id","daily_budget"}"#,
    }
}
