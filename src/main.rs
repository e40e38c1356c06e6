//! adbrain CLI entry point.
//!
//! `serve` runs the HTTP surface, `run` executes one pipeline pass, and
//! `account` manages stored accounts.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::info;

use adbrain::app::{build_orchestrator, open_store};
use adbrain::brain::RunRequest;
use adbrain::config::AdbrainConfig;
use adbrain::server::{self, AppState};
use adbrain::store::{Account, AccountStore};

/// adbrain: plan, validate, and dispatch ad-campaign optimizations.
#[derive(Parser)]
#[command(name = "adbrain", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server.
    Serve,
    /// Run the pipeline once for an account and print the outcome.
    Run {
        /// Internal account identifier.
        account: String,
        /// Send validated actions to the executor (default is a dry run).
        #[arg(long)]
        dispatch: bool,
        /// Reuse a specific idempotency key.
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Manage stored accounts.
    Account {
        /// Account action.
        #[command(subcommand)]
        action: AccountCommand,
    },
}

/// Account subcommands.
#[derive(Subcommand)]
enum AccountCommand {
    /// Create or replace an account.
    Add(AccountArgs),
    /// Print an account with secrets redacted, plus its latest runs.
    Show {
        /// Internal account identifier.
        id: String,
        /// Recent execution records to list.
        #[arg(long, default_value_t = 5)]
        executions: usize,
    },
}

/// Fields for `account add`.
#[derive(Args)]
struct AccountArgs {
    /// Internal account identifier.
    #[arg(long)]
    id: String,
    /// Platform ad-account id (e.g. `act_123`).
    #[arg(long)]
    ad_account_id: String,
    /// Platform access token.
    #[arg(long, env = "ADBRAIN_ACCESS_TOKEN")]
    access_token: String,
    /// Platform page id.
    #[arg(long)]
    page_id: Option<String>,
    /// Telegram chat id for reports.
    #[arg(long)]
    telegram_id: Option<String>,
    /// Per-account Telegram bot token.
    #[arg(long)]
    telegram_bot_token: Option<String>,
    /// Display name.
    #[arg(long)]
    username: Option<String>,
    /// Client-specific prompt fragment.
    #[arg(long)]
    policy_prompt: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => handle_serve().await,
        Command::Run {
            account,
            dispatch,
            idempotency_key,
        } => {
            adbrain::logging::init_cli();
            handle_run(account, dispatch, idempotency_key).await
        }
        Command::Account { action } => {
            adbrain::logging::init_cli();
            handle_account(action).await
        }
    }
}

async fn handle_serve() -> anyhow::Result<()> {
    let config = AdbrainConfig::load().context("failed to load configuration")?;
    let logs_dir = config.storage.logs_dir()?;
    let _logging_guard = adbrain::logging::init_production(&logs_dir)?;
    info!(version = env!("CARGO_PKG_VERSION"), "adbrain starting");

    let store = open_store(&config).await?;
    let orchestrator = Arc::new(build_orchestrator(&config, store)?);
    server::serve(
        AppState { orchestrator },
        &config.server.host,
        config.server.port,
    )
    .await
}

async fn handle_run(
    account: String,
    dispatch: bool,
    idempotency_key: Option<String>,
) -> anyhow::Result<()> {
    let config = AdbrainConfig::load().context("failed to load configuration")?;
    let store = open_store(&config).await?;
    let orchestrator = build_orchestrator(&config, store)?;

    let outcome = orchestrator
        .run(RunRequest {
            idempotency_key,
            account_id: account,
            dispatch,
        })
        .await
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.code()))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    eprintln!("\n{}", outcome.report_text);
    Ok(())
}

async fn handle_account(action: AccountCommand) -> anyhow::Result<()> {
    let config = AdbrainConfig::load().context("failed to load configuration")?;
    let store = open_store(&config).await?;

    match action {
        AccountCommand::Add(args) => {
            let account = Account {
                id: args.id,
                ad_account_id: args.ad_account_id,
                access_token: args.access_token,
                page_id: args.page_id,
                telegram_id: args.telegram_id,
                telegram_bot_token: args.telegram_bot_token,
                username: args.username,
                policy_prompt: args.policy_prompt,
            };
            store
                .upsert_account(&account)
                .await
                .context("failed to save account")?;
            println!("saved account {}", account.id);
        }
        AccountCommand::Show { id, executions } => {
            let account = store.get_account(&id).await?;
            let runs: Vec<_> = store
                .recent_executions(&id, executions)
                .await
                .context("failed to load execution history")?
                .into_iter()
                .map(|run| {
                    json!({
                        "idempotency_key": run.idempotency_key,
                        "status": run.status,
                        "actions": run.actions,
                        "duration_ms": run.duration_ms,
                        "created_at": run.created_at,
                    })
                })
                .collect();
            let redacted = json!({
                "id": account.id,
                "ad_account_id": account.ad_account_id,
                "access_token": "[REDACTED]",
                "page_id": account.page_id,
                "telegram_id": account.telegram_id,
                "telegram_bot_token": account.telegram_bot_token.as_ref().map(|_| "[REDACTED]"),
                "username": account.username,
                "policy_prompt": account.policy_prompt,
                "recent_executions": runs,
            });
            println!("{}", serde_json::to_string_pretty(&redacted)?);
        }
    }
    Ok(())
}
