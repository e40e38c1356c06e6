//! Process wiring: config and store in, orchestrator out.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::brain::{Collaborators, Dispatcher, Orchestrator, Planner};
use crate::config::AdbrainConfig;
use crate::executor::HttpExecutor;
use crate::platform::GraphApiClient;
use crate::providers::openai::OpenAiProvider;
use crate::store::SqliteStore;
use crate::telegram::TelegramNotifier;

/// Open the configured database.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the database opened.
pub async fn open_store(config: &AdbrainConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.storage.database_path()?;
    let store = SqliteStore::open(&path).await?;
    info!(path = %path.display(), "database opened");
    Ok(Arc::new(store))
}

/// Build the planner the config asks for.
pub fn build_planner(config: &AdbrainConfig) -> Planner {
    let reasoning = &config.reasoning;
    if !reasoning.enabled {
        info!("reasoning disabled, plans will be empty");
        return Planner::disabled();
    }
    let api_key = reasoning.api_key.clone().unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!("reasoning enabled but OPENAI_API_KEY is not set; runs will fail at planning");
    }
    Planner::new(Arc::new(OpenAiProvider::new(
        reasoning.model.clone(),
        api_key,
        &reasoning.base_url,
        config.reasoning_timeouts(),
    )))
}

/// Assemble the orchestrator from config and an open store.
///
/// # Errors
///
/// Returns an error if the config's limits are invalid.
pub fn build_orchestrator(
    config: &AdbrainConfig,
    store: Arc<SqliteStore>,
) -> anyhow::Result<Orchestrator> {
    let settings = config.run_settings().context("invalid run settings")?;

    let executor = HttpExecutor::new(&config.executor.base_url, config.http_timeouts());
    if executor.endpoint().is_none() {
        warn!("AGENT_SERVICE_URL is not set; dispatching runs will fail");
    }

    let deps = Collaborators {
        accounts: store.clone(),
        history: store.clone(),
        platform: Arc::new(GraphApiClient::new(
            &config.platform.base_url,
            &config.platform.api_version,
            config.http_timeouts(),
        )),
        planner: build_planner(config),
        dispatcher: Dispatcher::new(Arc::new(executor), config.executor.source.clone()),
        messaging: Arc::new(TelegramNotifier::new(
            config.telegram.fallback_bot_token.clone(),
        )),
        archive: store,
    };
    Ok(Orchestrator::new(deps, settings))
}
