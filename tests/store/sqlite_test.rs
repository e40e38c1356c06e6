//! SQLite-backed account, history, and archive storage.

use serde_json::json;

use adbrain::actions::Action;
use adbrain::store::{
    Account, AccountStore, ArchivedReport, ExecutionRecord, ExecutionStatus, ReportHistoryStore,
    RunArchive, SqliteStore, StoreError,
};

async fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = SqliteStore::open(&dir.path().join("nested").join("adbrain.db"))
        .await
        .expect("store should open");
    (dir, store)
}

fn account(id: &str) -> Account {
    Account {
        id: id.to_owned(),
        ad_account_id: "act_100".to_owned(),
        access_token: "EAAtoken".to_owned(),
        page_id: Some("p1".to_owned()),
        telegram_id: Some("555".to_owned()),
        telegram_bot_token: None,
        username: Some("shop".to_owned()),
        policy_prompt: Some("Prefer pausing over budget cuts.".to_owned()),
    }
}

fn report(text: &str) -> ArchivedReport {
    ArchivedReport {
        text: text.to_owned(),
        date: "2025-01-01".to_owned(),
        plan_note: None,
        actions: Vec::new(),
    }
}

#[tokio::test]
async fn upsert_then_get_round_trips_and_replaces() {
    let (_dir, store) = open_store().await;
    let mut acct = account("u1");
    store.upsert_account(&acct).await.expect("insert");
    assert_eq!(store.get_account("u1").await.expect("get"), acct);

    acct.telegram_id = None;
    acct.policy_prompt = None;
    store.upsert_account(&acct).await.expect("replace");
    let loaded = store.get_account("u1").await.expect("get after replace");
    assert_eq!(loaded.telegram_id, None);
    assert_eq!(loaded.policy_prompt, None);
}

#[tokio::test]
async fn missing_account_is_not_found() {
    let (_dir, store) = open_store().await;
    match store.get_account("ghost").await {
        Err(StoreError::AccountNotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected not found, got: {other:?}"),
    }
}

#[tokio::test]
async fn recent_reports_are_newest_first_and_limited() {
    let (_dir, store) = open_store().await;
    for text in ["first", "second", "third", "fourth"] {
        store.save_report("555", &report(text)).await.expect("save");
    }
    store
        .save_report("999", &report("other chat"))
        .await
        .expect("save");

    let reports = store.recent_reports("555", 3).await.expect("history");
    let texts: Vec<String> = reports.iter().map(|r| r.text()).collect();
    assert_eq!(texts, vec!["fourth", "third", "second"]);
    assert!(reports.iter().all(|r| !r.created_at.is_empty()));

    assert!(store
        .recent_reports("nobody", 3)
        .await
        .expect("history")
        .is_empty());
}

#[tokio::test]
async fn archived_report_keeps_structured_fields() {
    let (_dir, store) = open_store().await;
    let archived = ArchivedReport {
        text: "Report for 2025-01-01".to_owned(),
        date: "2025-01-01".to_owned(),
        plan_note: Some("cpl high".to_owned()),
        actions: vec![Action::GetCampaignStatus {
            campaign_id: "C1".to_owned(),
        }],
    };
    store.save_report("555", &archived).await.expect("save");

    let reports = store.recent_reports("555", 1).await.expect("history");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].report_data["planNote"], "cpl high");
    assert_eq!(
        reports[0].report_data["actions"][0],
        json!({"type": "GetCampaignStatus", "params": {"campaign_id": "C1"}})
    );
}

#[tokio::test]
async fn executions_are_archived_per_account() {
    let (_dir, store) = open_store().await;
    let record = ExecutionRecord {
        user_account_id: "u1".to_owned(),
        idempotency_key: "think-20250101-0900-aaaaaa".to_owned(),
        plan: json!({"planNote": null, "actions": []}),
        actions: vec![Action::UpdateAdSetDailyBudget {
            adset_id: "A1".to_owned(),
            daily_budget: 1500,
        }],
        executor_response: Some(json!({"ok": true})),
        report_text: "Report".to_owned(),
        status: ExecutionStatus::Success,
        duration_ms: 42,
    };
    store.save_execution(&record).await.expect("save first");
    store
        .save_execution(&ExecutionRecord {
            idempotency_key: "think-20250101-0905-bbbbbb".to_owned(),
            executor_response: None,
            ..record.clone()
        })
        .await
        .expect("save second");

    let rows = store.recent_executions("u1", 10).await.expect("executions");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].idempotency_key, "think-20250101-0905-bbbbbb");
    assert_eq!(rows[0].executor_response, None);
    assert_eq!(rows[1].executor_response, Some(json!({"ok": true})));
    assert_eq!(rows[1].status, "success");
    assert_eq!(rows[1].duration_ms, 42);
    assert_eq!(
        rows[1].actions,
        json!([{"type": "UpdateAdSetDailyBudget", "params": {"adset_id": "A1", "daily_budget": 1500}}])
    );

    assert!(store
        .recent_executions("u2", 10)
        .await
        .expect("executions")
        .is_empty());
}

#[tokio::test]
async fn reopening_keeps_data() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("adbrain.db");
    {
        let store = SqliteStore::open(&path).await.expect("open");
        store.upsert_account(&account("u1")).await.expect("insert");
    }
    let store = SqliteStore::open(&path).await.expect("reopen");
    assert_eq!(store.get_account("u1").await.expect("get").id, "u1");
}
