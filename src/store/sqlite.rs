//! SQLite-backed store.
//!
//! Holds accounts, archived reports, and execution records. The schema is
//! applied inline via `include_str!` on first open.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{
    Account, AccountStore, ArchivedReport, ExecutionRecord, ReportHistoryStore, ReportRecord,
    RunArchive, StoreError,
};

type AccountRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// An execution row as read back from `brain_executions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredExecution {
    /// Idempotency key of the run.
    pub idempotency_key: String,
    /// Stored plan JSON.
    pub plan: serde_json::Value,
    /// Stored validated actions JSON.
    pub actions: serde_json::Value,
    /// Stored executor reply, if the run dispatched.
    pub executor_response: Option<serde_json::Value>,
    /// Rendered report text.
    pub report_text: String,
    /// Final status string.
    pub status: String,
    /// Run duration in milliseconds.
    pub duration_ms: i64,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
}

/// The adbrain SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migration fails.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        let migration_sql = include_str!("../../migrations/001_adbrain_schema.sql");
        sqlx::raw_sql(migration_sql)
            .execute(&pool)
            .await
            .context("failed to apply schema migration")?;

        Ok(Self { pool })
    }

    /// Insert or replace an account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO user_accounts
                (id, ad_account_id, access_token, page_id, telegram_id,
                 telegram_bot_token, username, policy_prompt)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
              ON CONFLICT(id) DO UPDATE SET
                ad_account_id = excluded.ad_account_id,
                access_token = excluded.access_token,
                page_id = excluded.page_id,
                telegram_id = excluded.telegram_id,
                telegram_bot_token = excluded.telegram_bot_token,
                username = excluded.username,
                policy_prompt = excluded.policy_prompt",
        )
        .bind(&account.id)
        .bind(&account.ad_account_id)
        .bind(&account.access_token)
        .bind(&account.page_id)
        .bind(&account.telegram_id)
        .bind(&account.telegram_bot_token)
        .bind(&account.username)
        .bind(&account.policy_prompt)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Execution records for an account, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the read fails or a JSON column is corrupt.
    pub async fn recent_executions(
        &self,
        user_account_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredExecution>, StoreError> {
        let rows = sqlx::query_as::<
            _,
            (String, String, String, Option<String>, String, String, i64, String),
        >(
            "SELECT idempotency_key, plan_json, actions_json, executor_response,
                    report_text, status, duration_ms, created_at
             FROM brain_executions
             WHERE user_account_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(user_account_id)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(key, plan, actions, response, report_text, status, duration_ms, created_at)| {
                    Ok(StoredExecution {
                        idempotency_key: key,
                        plan: serde_json::from_str(&plan)?,
                        actions: serde_json::from_str(&actions)?,
                        executor_response: response
                            .as_deref()
                            .map(serde_json::from_str)
                            .transpose()?,
                        report_text,
                        status,
                        duration_ms,
                        created_at,
                    })
                },
            )
            .collect()
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get_account(&self, id: &str) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, ad_account_id, access_token, page_id, telegram_id,
                    telegram_bot_token, username, policy_prompt
             FROM user_accounts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            id,
            ad_account_id,
            access_token,
            page_id,
            telegram_id,
            telegram_bot_token,
            username,
            policy_prompt,
        )) = row
        else {
            return Err(StoreError::AccountNotFound(id.to_owned()));
        };

        Ok(Account {
            id,
            ad_account_id,
            access_token,
            page_id,
            telegram_id,
            telegram_bot_token,
            username,
            policy_prompt,
        })
    }
}

#[async_trait]
impl ReportHistoryStore for SqliteStore {
    async fn recent_reports(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT report_data, created_at
             FROM campaign_reports
             WHERE telegram_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(identity)
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(data, created_at)| ReportRecord {
                // Rows written by other tools may hold plain text.
                report_data: serde_json::from_str(&data)
                    .unwrap_or(serde_json::Value::String(data)),
                created_at,
            })
            .collect())
    }
}

#[async_trait]
impl RunArchive for SqliteStore {
    async fn save_report(
        &self,
        identity: &str,
        report: &ArchivedReport,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(report)?;
        sqlx::query("INSERT INTO campaign_reports (telegram_id, report_data) VALUES (?1, ?2)")
            .bind(identity)
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_execution(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        let plan = serde_json::to_string(&record.plan)?;
        let actions = serde_json::to_string(&record.actions)?;
        let response = record
            .executor_response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r"INSERT INTO brain_executions
                (user_account_id, idempotency_key, plan_json, actions_json,
                 executor_response, report_text, status, duration_ms)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&record.user_account_id)
        .bind(&record.idempotency_key)
        .bind(plan)
        .bind(actions)
        .bind(response)
        .bind(&record.report_text)
        .bind(record.status.as_str())
        .bind(record.duration_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
