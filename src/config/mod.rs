//! Configuration models for the orchestrator, scheduler, and store backends.

pub mod app;

pub use app::{
    AppConfig, FireRoute, MissedTaskPolicy, OrchestratorConfig, SchedulerConfig,
    StoreBackendConfig,
};
