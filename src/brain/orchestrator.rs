//! Run orchestration.
//!
//! One [`Orchestrator::run`] call is one pass through
//! FETCHING, PLANNING, VALIDATING, (DISPATCHING), REPORTING. Upstream reads
//! run concurrently and degrade to placeholders; the stages after them are
//! sequential and all-or-nothing. Archival and delivery happen after the
//! report is rendered and never change the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn, Instrument};

use crate::actions::{Action, ActionValidator};
use crate::platform::PlatformDataSource;
use crate::store::{
    Account, AccountStore, ArchivedReport, ExecutionRecord, ExecutionStatus, ReportHistoryStore,
    ReportRecord, RunArchive,
};
use crate::telegram::{Destination, MessagingChannel};

use super::context::{assemble, Defaults, UpstreamSnapshot};
use super::planner::{Plan, PlanSource, Planner};
use super::prompt::policy_prompt;
use super::{idempotency, report, Dispatcher, RunError, RunStage};

/// Immutable settings threaded into the orchestrator at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Numeric defaults for the decision payload and prompt.
    pub defaults: Defaults,
    /// Allowed action kinds and budget ceiling.
    pub validator: ActionValidator,
    /// Prior reports fetched per run.
    pub history_limit: usize,
    /// Serialize runs for the same account within this process.
    pub serialize_per_account: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            validator: ActionValidator::default(),
            history_limit: report::HISTORY_IN_REPORT,
            serialize_per_account: true,
        }
    }
}

/// External capabilities the pipeline depends on.
#[derive(Clone)]
pub struct Collaborators {
    /// Account lookup.
    pub accounts: Arc<dyn AccountStore>,
    /// Prior report lookup.
    pub history: Arc<dyn ReportHistoryStore>,
    /// Platform reads.
    pub platform: Arc<dyn PlatformDataSource>,
    /// Reasoning engine access.
    pub planner: Planner,
    /// Executor access.
    pub dispatcher: Dispatcher,
    /// Report delivery.
    pub messaging: Arc<dyn MessagingChannel>,
    /// Report and execution archival.
    pub archive: Arc<dyn RunArchive>,
}

/// A run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Caller-supplied idempotency key; generated when absent.
    pub idempotency_key: Option<String>,
    /// Internal account identifier.
    pub account_id: String,
    /// Dispatch validated actions; `false` is a dry run.
    pub dispatch: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// Key used for this run.
    pub idempotency_key: String,
    /// Advisory note from the plan.
    pub plan_note: Option<String>,
    /// Validated actions.
    pub actions: Vec<Action>,
    /// Whether the actions were sent to the executor.
    pub dispatched: bool,
    /// Parsed executor reply when dispatched.
    #[serde(rename = "agentResponse")]
    pub executor_response: Option<Value>,
    /// Whether the report reached the messaging channel.
    pub telegram_sent: bool,
    /// Rendered report.
    #[serde(skip)]
    pub report_text: String,
}

/// A plan-only request: no platform reads, no account lookup, no dispatch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DecideRequest {
    /// Free-form goal passed to the reasoning engine.
    pub goal: Option<Value>,
    /// Free-form inputs; `client_prompt` is used as the prompt fragment.
    pub inputs: Option<Value>,
}

/// Result of a plan-only request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Advisory note from the plan.
    pub plan_note: Option<String>,
    /// Validated actions.
    pub actions: Vec<Action>,
}

type AccountLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Sequences the pipeline.
pub struct Orchestrator {
    deps: Collaborators,
    settings: RunSettings,
    account_locks: Arc<AccountLocks>,
}

/// Holds an account's run lock; drops the map entry once nobody else wants it.
struct AccountLease {
    guard: Option<OwnedMutexGuard<()>>,
    account_id: String,
    locks: Arc<AccountLocks>,
}

impl Drop for AccountLease {
    fn drop(&mut self) {
        // The guard owns a reference to the lock, so release it before counting.
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(&self.account_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.account_id);
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator over `deps` with fixed `settings`.
    pub fn new(deps: Collaborators, settings: RunSettings) -> Self {
        Self {
            deps,
            settings,
            account_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Accounts with a run in flight or waiting for one.
    pub fn busy_accounts(&self) -> usize {
        self.account_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run the full pipeline for one account.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if the account lookup, planning, validation, or
    /// dispatch fails. Upstream read, history, archival, and delivery
    /// failures are logged and never returned.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, RunError> {
        let idempotency_key = idempotency::resolve(request.idempotency_key.as_deref());
        let span = tracing::info_span!(
            "run",
            account_id = %request.account_id,
            idempotency_key = %idempotency_key,
        );

        async {
            let result = self.run_inner(&request, idempotency_key).await;
            if let Err(e) = &result {
                error!(stage = %e.stage(), code = e.code(), error = %e, "run failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_inner(
        &self,
        request: &RunRequest,
        idempotency_key: String,
    ) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        info!(stage = %RunStage::Fetching, dispatch = request.dispatch, "run started");
        let account = self.deps.accounts.get_account(&request.account_id).await?;
        let _lease = self.lock_account(&request.account_id).await;
        debug!(busy_accounts = self.busy_accounts(), "account lock held");
        let (upstream, history) = self.fetch(&account).await;
        let date = upstream.report_date(Utc::now().date_naive());

        info!(stage = %RunStage::Planning, "requesting plan");
        let system = policy_prompt(
            account.policy_prompt.as_deref().unwrap_or_default(),
            &self.settings.defaults,
            &self.settings.validator,
        );
        let payload = assemble(
            &request.account_id,
            &upstream,
            history.clone(),
            self.settings.defaults,
        );
        let plan = self.deps.planner.request_plan(&system, &payload).await?;

        info!(
            stage = %RunStage::Validating,
            proposed = plan.actions.len(),
            "validating plan"
        );
        let actions = self.validate(&plan)?;

        let executor_response = if request.dispatch && !actions.is_empty() {
            info!(stage = %RunStage::Dispatching, actions = actions.len(), "dispatching");
            Some(
                self.deps
                    .dispatcher
                    .dispatch(&idempotency_key, &request.account_id, &actions)
                    .await?,
            )
        } else {
            None
        };
        let dispatched = executor_response.is_some();

        info!(stage = %RunStage::Reporting, dispatched, "building report");
        let executed: &[Action] = if dispatched { &actions } else { &[] };
        let report_text = report::build(&date, &upstream.account_status, executed, &history);

        let identity = account.telegram_id.clone().unwrap_or_default();
        self.archive_report(
            &identity,
            &ArchivedReport {
                text: report_text.clone(),
                date,
                plan_note: plan.plan_note.clone(),
                actions: actions.clone(),
            },
        )
        .await;
        self.archive_execution(&ExecutionRecord {
            user_account_id: request.account_id.clone(),
            idempotency_key: idempotency_key.clone(),
            plan: plan.to_json(),
            actions: actions.clone(),
            executor_response: executor_response.clone(),
            report_text: report_text.clone(),
            status: ExecutionStatus::Success,
            duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
        })
        .await;

        let telegram_sent = self.deliver(&account, &report_text).await;
        info!(
            actions = actions.len(),
            dispatched,
            telegram_sent,
            "run complete"
        );

        Ok(RunOutcome {
            idempotency_key,
            plan_note: plan.plan_note,
            actions,
            dispatched,
            executor_response,
            telegram_sent,
            report_text,
        })
    }

    /// Produce a validated plan without reading or changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] if planning or validation fails.
    pub async fn decide(&self, request: &DecideRequest) -> Result<Decision, RunError> {
        let fragment = request
            .inputs
            .as_ref()
            .and_then(|inputs| inputs.get("client_prompt"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let system = policy_prompt(fragment, &self.settings.defaults, &self.settings.validator);
        let payload = json!({ "goal": request.goal, "inputs": request.inputs });

        let result = self.decide_inner(&system, &payload).await;
        if let Err(e) = &result {
            error!(stage = %e.stage(), code = e.code(), error = %e, "decide failed");
        }
        result
    }

    async fn decide_inner(&self, system: &str, payload: &Value) -> Result<Decision, RunError> {
        let plan = self.deps.planner.request_plan(system, payload).await?;
        let actions = self.validate(&plan)?;
        Ok(Decision {
            plan_note: plan.plan_note,
            actions,
        })
    }

    fn validate(&self, plan: &Plan) -> Result<Vec<Action>, RunError> {
        match plan.source {
            PlanSource::Disabled => Ok(Vec::new()),
            PlanSource::Reasoning => Ok(self.settings.validator.validate(&plan.actions)?),
        }
    }

    async fn lock_account(&self, account_id: &str) -> Option<AccountLease> {
        if !self.settings.serialize_per_account {
            return None;
        }
        let lock = {
            let mut locks = self
                .account_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(account_id.to_owned()).or_default())
        };
        let guard = lock.lock_owned().await;
        Some(AccountLease {
            guard: Some(guard),
            account_id: account_id.to_owned(),
            locks: Arc::clone(&self.account_locks),
        })
    }

    async fn fetch(&self, account: &Account) -> (UpstreamSnapshot, Vec<ReportRecord>) {
        let platform = &self.deps.platform;
        let ad_account = account.ad_account_id.as_str();
        let token = account.access_token.as_str();

        let (status, adsets, insights, history) = tokio::join!(
            platform.account_status(ad_account, token),
            platform.adsets(ad_account, token),
            platform.yesterday_insights(ad_account, token),
            self.recent_history(account.telegram_id.as_deref()),
        );
        (UpstreamSnapshot::from_results(status, adsets, insights), history)
    }

    async fn recent_history(&self, identity: Option<&str>) -> Vec<ReportRecord> {
        let Some(identity) = identity.filter(|id| !id.trim().is_empty()) else {
            return Vec::new();
        };
        match self
            .deps
            .history
            .recent_reports(identity, self.settings.history_limit)
            .await
        {
            Ok(reports) => reports,
            Err(e) => {
                warn!(error = %e, "failed to load report history");
                Vec::new()
            }
        }
    }

    async fn archive_report(&self, identity: &str, report: &ArchivedReport) {
        if let Err(e) = self.deps.archive.save_report(identity, report).await {
            warn!(error = %e, "failed to save campaign report");
        }
    }

    async fn archive_execution(&self, record: &ExecutionRecord) {
        if let Err(e) = self.deps.archive.save_execution(record).await {
            warn!(error = %e, "failed to save execution record");
        }
    }

    async fn deliver(&self, account: &Account, text: &str) -> bool {
        let destination = Destination {
            chat_id: account.telegram_id.clone(),
            bot_token: account.telegram_bot_token.clone(),
        };
        match self.deps.messaging.deliver(&destination, text).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "failed to deliver report");
                false
            }
        }
    }
}
