//! Tests for error types

use assistant_dispatch::core::{DispatchError, SchedulerError};

#[test]
fn test_invalid_cron_error() {
    let err = SchedulerError::InvalidCron {
        expr: "in 5 minutes".to_string(),
        message: "invalid expression".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "invalid cron expression `in 5 minutes`: invalid expression"
    );
}

#[test]
fn test_job_not_found_error() {
    let err = SchedulerError::JobNotFound("task_1".to_string());
    assert_eq!(format!("{}", err), "timer job not found: task_1");
}

#[test]
fn test_engine_stopped_error() {
    let err = SchedulerError::EngineStopped;
    assert_eq!(format!("{}", err), "timer engine is not running");
}

#[test]
fn test_store_error() {
    let err = SchedulerError::Store("connection failed".to_string());
    assert_eq!(format!("{}", err), "store error: connection failed");
}

#[test]
fn test_action_failed_error_keeps_source() {
    let err = DispatchError::ActionFailed {
        task: "voice_command".to_string(),
        source: anyhow::anyhow!("speaker offline"),
    };
    assert_eq!(
        format!("{}", err),
        "task `voice_command` failed: speaker offline"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_dropped_error() {
    let err = DispatchError::Dropped {
        task: "digest".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "task `digest` was dropped before producing a result"
    );
}
