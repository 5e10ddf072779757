//! Application, orchestrator, and scheduler configuration structures.

use serde::{Deserialize, Serialize};

/// Orchestrator dispatch loop tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How long the loop waits for work before reporting idle.
    pub idle_timeout_secs: u64,
    /// Pause after pushing back a task that could not take the slot.
    pub requeue_backoff_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60,
            requeue_backoff_ms: 100,
        }
    }
}

impl OrchestratorConfig {
    /// Validate timing values.
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than 0".into());
        }
        if self.requeue_backoff_ms == 0 {
            return Err("requeue_backoff_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Task store backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory store for development/testing. Nothing survives a restart.
    #[default]
    InMemory,
    /// JSON-lines file store.
    File {
        /// Path of the store file.
        path: String,
    },
}

/// How a fired scheduled task reaches the prompt executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireRoute {
    /// Call the executor from the timer job.
    #[default]
    Direct,
    /// Queue the prompt on the orchestrator at the task's priority.
    Orchestrator,
}

/// What recovery does with a one-shot task whose time passed during downtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissedTaskPolicy {
    /// Mark it cancelled and never run it.
    #[default]
    Cancel,
    /// Run it once as soon as the scheduler starts.
    RunImmediately,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Store backend.
    pub store: StoreBackendConfig,
    /// Fire route.
    pub fire_route: FireRoute,
    /// Missed-task policy applied at startup.
    pub missed_policy: MissedTaskPolicy,
}

impl SchedulerConfig {
    /// Validate backend settings.
    pub fn validate(&self) -> Result<(), String> {
        if let StoreBackendConfig::File { path } = &self.store {
            if path.trim().is_empty() {
                return Err("file store path must not be empty".into());
            }
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Orchestrator settings.
    pub orchestrator: OrchestratorConfig,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.orchestrator
            .validate()
            .map_err(|e| format!("orchestrator invalid: {e}"))?;
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `DISPATCH_*` environment variables, loading a
    /// `.env` file first if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(format!("failed to load .env: {e}")),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup and validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();

        if let Some(v) = lookup("DISPATCH_IDLE_TIMEOUT_SECS") {
            cfg.orchestrator.idle_timeout_secs = parse_number("DISPATCH_IDLE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DISPATCH_REQUEUE_BACKOFF_MS") {
            cfg.orchestrator.requeue_backoff_ms = parse_number("DISPATCH_REQUEUE_BACKOFF_MS", &v)?;
        }

        if let Some(v) = lookup("DISPATCH_STORE") {
            cfg.scheduler.store = match v.trim().to_ascii_lowercase().as_str() {
                "memory" | "in_memory" => StoreBackendConfig::InMemory,
                "file" => StoreBackendConfig::File {
                    path: lookup("DISPATCH_STORE_PATH").unwrap_or_default(),
                },
                other => return Err(format!("DISPATCH_STORE: unknown backend `{other}`")),
            };
        }
        if let Some(v) = lookup("DISPATCH_FIRE_ROUTE") {
            cfg.scheduler.fire_route = match v.trim().to_ascii_lowercase().as_str() {
                "direct" => FireRoute::Direct,
                "orchestrator" => FireRoute::Orchestrator,
                other => return Err(format!("DISPATCH_FIRE_ROUTE: unknown route `{other}`")),
            };
        }
        if let Some(v) = lookup("DISPATCH_MISSED_POLICY") {
            cfg.scheduler.missed_policy = match v.trim().to_ascii_lowercase().as_str() {
                "cancel" => MissedTaskPolicy::Cancel,
                "run_immediately" => MissedTaskPolicy::RunImmediately,
                other => return Err(format!("DISPATCH_MISSED_POLICY: unknown policy `{other}`")),
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}: `{value}` is not a number: {e}"))
}
