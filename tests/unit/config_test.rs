//! Tests for configuration validation

use std::collections::HashMap;

use assistant_dispatch::config::{
    AppConfig, FireRoute, MissedTaskPolicy, OrchestratorConfig, SchedulerConfig,
    StoreBackendConfig,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let cfg = AppConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.orchestrator.idle_timeout_secs, 60);
    assert_eq!(cfg.orchestrator.requeue_backoff_ms, 100);
    assert_eq!(cfg.scheduler.store, StoreBackendConfig::InMemory);
    assert_eq!(cfg.scheduler.fire_route, FireRoute::Direct);
    assert_eq!(cfg.scheduler.missed_policy, MissedTaskPolicy::Cancel);
}

#[test]
fn test_orchestrator_config_invalid_timeout() {
    let invalid = OrchestratorConfig {
        idle_timeout_secs: 0,
        requeue_backoff_ms: 100,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_orchestrator_config_invalid_backoff() {
    let invalid = OrchestratorConfig {
        idle_timeout_secs: 60,
        requeue_backoff_ms: 0,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_file_store_requires_path() {
    let invalid = SchedulerConfig {
        store: StoreBackendConfig::File {
            path: "  ".to_string(),
        },
        ..SchedulerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "orchestrator": { "idle_timeout_secs": 5 },
        "scheduler": {
            "store": { "file": { "path": "/var/lib/assistant/tasks.jsonl" } },
            "fire_route": "orchestrator",
            "missed_policy": "run_immediately"
        }
    }"#;

    let cfg = AppConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.orchestrator.idle_timeout_secs, 5);
    assert_eq!(cfg.orchestrator.requeue_backoff_ms, 100);
    assert_eq!(
        cfg.scheduler.store,
        StoreBackendConfig::File {
            path: "/var/lib/assistant/tasks.jsonl".to_string()
        }
    );
    assert_eq!(cfg.scheduler.fire_route, FireRoute::Orchestrator);
    assert_eq!(cfg.scheduler.missed_policy, MissedTaskPolicy::RunImmediately);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(AppConfig::from_json_str("{ not json").is_err());
    let err = AppConfig::from_json_str(r#"{ "orchestrator": { "idle_timeout_secs": 0 } }"#)
        .unwrap_err();
    assert!(err.contains("idle_timeout_secs"));
}

#[test]
fn test_from_lookup() {
    let cfg = AppConfig::from_lookup(lookup(&[
        ("DISPATCH_IDLE_TIMEOUT_SECS", "30"),
        ("DISPATCH_REQUEUE_BACKOFF_MS", "250"),
        ("DISPATCH_STORE", "file"),
        ("DISPATCH_STORE_PATH", "data/tasks.jsonl"),
        ("DISPATCH_FIRE_ROUTE", "orchestrator"),
        ("DISPATCH_MISSED_POLICY", "run_immediately"),
    ]))
    .unwrap();

    assert_eq!(cfg.orchestrator.idle_timeout_secs, 30);
    assert_eq!(cfg.orchestrator.requeue_backoff_ms, 250);
    assert_eq!(
        cfg.scheduler.store,
        StoreBackendConfig::File {
            path: "data/tasks.jsonl".to_string()
        }
    );
    assert_eq!(cfg.scheduler.fire_route, FireRoute::Orchestrator);
    assert_eq!(cfg.scheduler.missed_policy, MissedTaskPolicy::RunImmediately);
}

#[test]
fn test_from_lookup_empty_uses_defaults() {
    let cfg = AppConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, AppConfig::default());
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    assert!(AppConfig::from_lookup(lookup(&[("DISPATCH_IDLE_TIMEOUT_SECS", "soon")])).is_err());
    assert!(AppConfig::from_lookup(lookup(&[("DISPATCH_STORE", "postgres")])).is_err());
    assert!(AppConfig::from_lookup(lookup(&[("DISPATCH_STORE", "file")])).is_err());
    assert!(AppConfig::from_lookup(lookup(&[("DISPATCH_FIRE_ROUTE", "queue")])).is_err());
    assert!(AppConfig::from_lookup(lookup(&[("DISPATCH_MISSED_POLICY", "retry")])).is_err());
}
