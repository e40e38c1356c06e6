//! Configuration loading.
//!
//! Loads from `./adbrain.toml` (or `$ADBRAIN_CONFIG`). A missing file means
//! defaults. Precedence: env vars > config file > defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::actions::{ActionKind, ActionValidator, DEFAULT_MAX_DAILY_BUDGET_CENTS};
use crate::brain::{Defaults, RunSettings};
use crate::http::HttpTimeouts;
use crate::platform::graph::{GRAPH_API_BASE, GRAPH_API_VERSION};
use crate::providers::openai::OPENAI_API_BASE;

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdbrainConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Reasoning engine.
    pub reasoning: ReasoningConfig,
    /// Ads platform API.
    pub platform: PlatformConfig,
    /// Executor service.
    pub executor: ExecutorConfig,
    /// Report delivery.
    pub telegram: TelegramConfig,
    /// Persistent state.
    pub storage: StorageConfig,
    /// Numeric defaults for the decision payload.
    pub defaults: Defaults,
    /// Validation limits.
    pub limits: LimitsConfig,
    /// Outbound HTTP timeouts.
    pub http: HttpConfig,
    /// Run behavior.
    pub runs: RunsConfig,
}

impl AdbrainConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the result fails validation.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path: `$ADBRAIN_CONFIG`, else `./adbrain.toml`.
    pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("ADBRAIN_CONFIG").map_or_else(|| PathBuf::from("adbrain.toml"), PathBuf::from)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests never touch the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("BRAIN_PORT") {
            match v.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(
                    var = "BRAIN_PORT",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        if let Some(v) = env("BRAIN_USE_LLM") {
            self.reasoning.enabled = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = env("BRAIN_MODEL") {
            self.reasoning.model = v;
        }
        if let Some(v) = env("OPENAI_API_KEY") {
            self.reasoning.api_key = Some(v);
        }

        if let Some(v) = env("AGENT_SERVICE_URL") {
            self.executor.base_url = v;
        }
        if let Some(v) = env("TELEGRAM_FALLBACK_BOT_TOKEN") {
            self.telegram.fallback_bot_token = Some(v);
        }
        if let Some(v) = env("ADBRAIN_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config (no env overrides).
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.limits.allowed_kinds()?;
        anyhow::ensure!(
            self.limits.max_daily_budget_cents > 0,
            "limits.max_daily_budget_cents must be positive"
        );
        anyhow::ensure!(
            self.runs.history_limit > 0,
            "runs.history_limit must be positive"
        );
        Ok(())
    }

    /// The immutable settings handed to the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if `limits.allowed_actions` names an unknown kind.
    pub fn run_settings(&self) -> Result<RunSettings> {
        Ok(RunSettings {
            defaults: self.defaults,
            validator: ActionValidator::new(
                self.limits.allowed_kinds()?,
                self.limits.max_daily_budget_cents,
            ),
            history_limit: self.runs.history_limit,
            serialize_per_account: self.runs.serialize_per_account,
        })
    }

    /// Timeouts for platform and executor clients.
    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.http.connect_timeout_secs),
            request: Duration::from_secs(self.http.request_timeout_secs),
        }
    }

    /// Timeouts for the reasoning client.
    pub fn reasoning_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.http.connect_timeout_secs),
            request: Duration::from_secs(self.reasoning.timeout_secs),
        }
    }
}

/// Root directory for adbrain state (`~/.adbrain/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn data_dir() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".adbrain"))
}

// ── Server ──────────────────────────────────────────────────────

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 7080,
        }
    }
}

// ── Reasoning ───────────────────────────────────────────────────

/// Reasoning engine settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Call the reasoning engine; when off, every plan is empty.
    pub enabled: bool,
    /// Model identifier.
    pub model: String,
    /// API origin.
    pub base_url: String,
    /// API key (usually from `OPENAI_API_KEY`).
    pub api_key: Option<String>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4.1".to_owned(),
            base_url: OPENAI_API_BASE.to_owned(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl std::fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("enabled", &self.enabled)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Platform / executor / telegram ──────────────────────────────

/// Ads platform API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// API origin.
    pub base_url: String,
    /// Version path segment.
    pub api_version: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: GRAPH_API_BASE.to_owned(),
            api_version: GRAPH_API_VERSION.to_owned(),
        }
    }
}

/// Executor service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Service origin; `/api/agent/actions` is appended.
    pub base_url: String,
    /// `source` tag sent with every batch.
    pub source: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            source: crate::brain::dispatcher::DEFAULT_SOURCE.to_owned(),
        }
    }
}

/// Report delivery settings.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token used when an account has none.
    pub fallback_bot_token: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field(
                "fallback_bot_token",
                &self.fallback_bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

// ── Storage ─────────────────────────────────────────────────────

/// Persistent state locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; defaults to `~/.adbrain/adbrain.db`.
    pub database_path: Option<PathBuf>,
    /// Log directory for `serve`; defaults to `~/.adbrain/logs`.
    pub logs_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured or default database path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory is
    /// unknown.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("adbrain.db")),
        }
    }

    /// The configured or default log directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory is
    /// unknown.
    pub fn logs_dir(&self) -> Result<PathBuf> {
        match &self.logs_dir {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("logs")),
        }
    }
}

// ── Limits / http / runs ────────────────────────────────────────

/// Validation limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Inclusive daily budget ceiling in cents.
    pub max_daily_budget_cents: i64,
    /// Action type names accepted by the validator.
    pub allowed_actions: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_daily_budget_cents: DEFAULT_MAX_DAILY_BUDGET_CENTS,
            allowed_actions: ActionKind::ALL
                .iter()
                .map(|k| k.as_str().to_owned())
                .collect(),
        }
    }
}

impl LimitsConfig {
    /// Parse `allowed_actions`.
    ///
    /// # Errors
    ///
    /// Returns an error for any name outside the recognized set.
    pub fn allowed_kinds(&self) -> Result<Vec<ActionKind>> {
        self.allowed_actions
            .iter()
            .map(|name| {
                ActionKind::parse(name).ok_or_else(|| {
                    anyhow::anyhow!("unknown action type in limits.allowed_actions: {name}")
                })
            })
            .collect()
    }
}

/// Outbound HTTP timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

/// Run behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunsConfig {
    /// Prior reports loaded per run.
    pub history_limit: usize,
    /// Serialize runs for the same account.
    pub serialize_per_account: bool,
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            history_limit: 3,
            serialize_per_account: true,
        }
    }
}
