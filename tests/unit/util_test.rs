//! Tests for utility functions

use assistant_dispatch::core::Priority;
use assistant_dispatch::util::{init_tracing, now, parse_iso8601};
use chrono::{Duration, Timelike};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Urgent < Priority::High);
    assert!(Priority::High < Priority::Medium);
    assert!(Priority::Medium < Priority::Low);
    assert!(Priority::Low < Priority::Background);
    assert_eq!(Priority::Urgent.value(), 1);
    assert_eq!(Priority::Background.to_string(), "BACKGROUND");
}

#[test]
fn test_parse_iso8601_with_offset() {
    let dt = parse_iso8601("2030-05-01T12:00:00-04:00").unwrap();
    assert_eq!(dt.hour(), 16);
}

#[test]
fn test_parse_iso8601_rejects_cron() {
    assert!(parse_iso8601("*/5 * * * *").is_none());
    assert!(parse_iso8601("0 9 * * 1-5").is_none());
}

#[test]
fn test_now_is_current() {
    let before = chrono::Utc::now();
    let t = now();
    assert!(t >= before);
    assert!(t - before < Duration::seconds(1));
}

#[test]
fn test_init_tracing_is_reentrant() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice without panicking");
}
