//! # Assistant Dispatch
//!
//! Task coordination layer for a personal-assistant backend.
//!
//! The assistant itself wires together third-party services (an LLM agent, a vector
//! memory, a document store, a smart-home hub, voice streaming). This crate owns the
//! part with real scheduling logic: deciding *what runs when*.
//!
//! ## Core Problem Solved
//!
//! - **Strict priority ordering**: heterogeneous units of work are ranked URGENT to
//!   BACKGROUND and dispatched most-urgent first
//! - **Best-effort preemption**: urgent work can displace long-running interruptible work
//! - **Durable time triggers**: scheduled prompts survive process restarts
//! - **One string, two meanings**: a schedule is either an ISO-8601 instant (one-shot) or a
//!   cron expression (recurring)
//!
//! ## Orchestrator - Priority-Preemptive Executor
//!
//! The `Orchestrator` runs at most one queued unit at a time and lets callers
//! `interrupt` with urgent work that bypasses the queue.
//!
//! ```rust,ignore
//! use assistant_dispatch::config::OrchestratorConfig;
//! use assistant_dispatch::core::{Orchestrator, Priority};
//! use assistant_dispatch::runtime::TokioSpawner;
//!
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default(), TokioSpawner::current());
//! orchestrator.start();
//!
//! orchestrator.queue_task(Priority::Low, "refresh_memory", || async { Ok(()) }, true);
//! let reply = orchestrator
//!     .interrupt(Priority::Urgent, "voice_command", || async { Ok("lights on") })
//!     .await?;
//! ```
//!
//! ## Scheduler - Durable Prompt Triggers
//!
//! The `Scheduler` persists every intent to a `TaskStore`, re-registers pending
//! intents on startup, and fires prompts through a `PromptExecutor`.
//!
//! ```rust,ignore
//! use assistant_dispatch::builders::build_context;
//! use assistant_dispatch::config::AppConfig;
//! use assistant_dispatch::core::Priority;
//!
//! let ctx = build_context(AppConfig::from_env()?, executor, notifier, TokioSpawner::current())?;
//! ctx.start().await;
//!
//! ctx.scheduler
//!     .schedule_task("owner", "standup", "Summarise my calendar", "0 9 * * 1-5", Priority::Medium)
//!     .await?;
//! ```
//!
//! For complete examples, see:
//! - `tests/orchestrator_test.rs` - priority, interruption and failure semantics
//! - `tests/scheduler_test.rs` - scheduling, recovery and firing

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch abstractions: task model, orchestrator, timers, scheduler.
pub mod core;
/// Configuration models for the orchestrator, scheduler, and store backends.
pub mod config;
/// Builders that assemble the application context from configuration.
pub mod builders;
/// Infrastructure adapters for task stores and client notification.
pub mod infra;
/// Runtime adapters and the transport-agnostic control surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
