//! Action validation against the closed vocabulary and budget ceiling.

use serde_json::json;

use adbrain::actions::{
    validate, Action, ActionKind, ActionValidator, CampaignStatus, InvalidPlanError,
};

#[test]
fn budget_above_ceiling_is_rejected() {
    let raw = vec![json!({
        "type": "UpdateAdSetDailyBudget",
        "params": {"adset_id": "A1", "daily_budget": 12000}
    })];

    let result = validate(&raw);
    match result {
        Err(InvalidPlanError::BudgetAboveLimit {
            adset_id, limit, ..
        }) => {
            assert_eq!(adset_id, "A1");
            assert_eq!(limit, 10_000);
        }
        other => panic!("expected budget error, got: {other:?}"),
    }
}

#[test]
fn budget_is_rounded_before_the_ceiling_check() {
    let raw = vec![
        json!({"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A1", "daily_budget": 9999.6}}),
        json!({"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A2", "daily_budget": 10000}}),
    ];

    let actions = match validate(&raw) {
        Ok(actions) => actions,
        Err(err) => panic!("budgets at the ceiling should pass: {err}"),
    };
    assert_eq!(
        actions,
        vec![
            Action::UpdateAdSetDailyBudget {
                adset_id: "A1".to_owned(),
                daily_budget: 10_000,
            },
            Action::UpdateAdSetDailyBudget {
                adset_id: "A2".to_owned(),
                daily_budget: 10_000,
            },
        ]
    );

    let over = vec![json!({
        "type": "UpdateAdSetDailyBudget",
        "params": {"adset_id": "A3", "daily_budget": 10000.5}
    })];
    assert!(matches!(
        validate(&over),
        Err(InvalidPlanError::BudgetAboveLimit { .. })
    ));
}

#[test]
fn numeric_string_budget_is_coerced() {
    let raw = vec![json!({
        "type": "UpdateAdSetDailyBudget",
        "params": {"adset_id": 42, "daily_budget": " 2500 "}
    })];

    let actions = validate(&raw).expect("numeric string budget should validate");
    assert_eq!(
        actions,
        vec![Action::UpdateAdSetDailyBudget {
            adset_id: "42".to_owned(),
            daily_budget: 2500,
        }]
    );
}

#[test]
fn non_numeric_budget_is_rejected() {
    let words = vec![json!({
        "type": "UpdateAdSetDailyBudget",
        "params": {"adset_id": "A1", "daily_budget": "lots"}
    })];
    assert!(matches!(
        validate(&words),
        Err(InvalidPlanError::InvalidBudget { .. })
    ));
}

#[test]
fn zero_and_negative_budgets_pass_through() {
    let raw = vec![
        json!({"type": "PauseCampaign", "params": {"campaign_id": "c1"}}),
        json!({"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A1", "daily_budget": 0}}),
        json!({"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A2", "daily_budget": 0.2}}),
        json!({"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A3", "daily_budget": -500}}),
    ];

    let actions = validate(&raw).expect("zero and negative budgets should validate");
    assert_eq!(actions.len(), 4);
    assert_eq!(
        actions[1..],
        [
            Action::UpdateAdSetDailyBudget {
                adset_id: "A1".to_owned(),
                daily_budget: 0,
            },
            Action::UpdateAdSetDailyBudget {
                adset_id: "A2".to_owned(),
                daily_budget: 0,
            },
            Action::UpdateAdSetDailyBudget {
                adset_id: "A3".to_owned(),
                daily_budget: -500,
            },
        ]
    );
}

#[test]
fn pause_without_campaign_id_fails_the_whole_plan() {
    let raw = vec![
        json!({"type": "GetCampaignStatus", "params": {"campaign_id": "C1"}}),
        json!({"type": "PauseCampaign", "params": {}}),
    ];

    match validate(&raw) {
        Err(InvalidPlanError::MissingParam { action, param }) => {
            assert_eq!(action, ActionKind::PauseCampaign);
            assert_eq!(param, "campaign_id");
        }
        other => panic!("expected missing param, got: {other:?}"),
    }
}

#[test]
fn pause_status_is_forced_and_extra_params_dropped() {
    let raw = vec![json!({
        "type": "PauseCampaign",
        "params": {"campaign_id": "C9", "status": "ACTIVE", "reason": "high cpl"}
    })];

    let actions = validate(&raw).expect("pause should validate");
    assert_eq!(
        actions,
        vec![Action::PauseCampaign {
            campaign_id: "C9".to_owned(),
            status: CampaignStatus::Paused,
        }]
    );
    assert_eq!(
        actions[0].params(),
        json!({"campaign_id": "C9", "status": "PAUSED"})
    );
}

#[test]
fn unknown_types_are_dropped_and_order_is_kept() {
    let raw = vec![
        json!({"type": "DeleteCampaign", "params": {"campaign_id": "C1"}}),
        json!({"type": "PauseCampaign", "params": {"campaign_id": "C2"}}),
        json!("not an object"),
        json!({"type": "GetCampaignStatus", "params": {"campaign_id": "C3"}}),
    ];

    let kinds: Vec<ActionKind> = validate(&raw)
        .expect("plan should validate")
        .iter()
        .map(Action::kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ActionKind::PauseCampaign, ActionKind::GetCampaignStatus]
    );
}

#[test]
fn only_unknown_types_yield_no_valid_actions() {
    let raw = vec![
        json!({"type": "DeleteCampaign", "params": {"campaign_id": "C1"}}),
        json!({"type": "CreateAd"}),
    ];
    assert_eq!(validate(&raw), Err(InvalidPlanError::NoValidActions));
    assert_eq!(validate(&[]), Err(InvalidPlanError::NoValidActions));
}

#[test]
fn narrowed_validator_drops_disallowed_kinds() {
    let validator = ActionValidator::new([ActionKind::GetCampaignStatus], 5_000);
    assert!(!validator.allows(ActionKind::PauseCampaign));
    assert_eq!(validator.max_daily_budget_cents(), 5_000);

    let raw = vec![
        json!({"type": "PauseCampaign", "params": {"campaign_id": "C1"}}),
        json!({"type": "GetCampaignStatus", "params": {"campaign_id": "C1"}}),
    ];
    let actions = validator.validate(&raw).expect("status query is allowed");
    assert_eq!(
        actions,
        vec![Action::GetCampaignStatus {
            campaign_id: "C1".to_owned(),
        }]
    );

    let only_pause = vec![json!({"type": "PauseCampaign", "params": {"campaign_id": "C1"}})];
    assert_eq!(
        validator.validate(&only_pause),
        Err(InvalidPlanError::NoValidActions)
    );
}

#[test]
fn narrowed_ceiling_applies() {
    let validator = ActionValidator::new(ActionKind::ALL, 3_000);
    let raw = vec![json!({
        "type": "UpdateAdSetDailyBudget",
        "params": {"adset_id": "A1", "daily_budget": 3001}
    })];
    assert!(matches!(
        validator.validate(&raw),
        Err(InvalidPlanError::BudgetAboveLimit { limit: 3_000, .. })
    ));
}
