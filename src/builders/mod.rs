//! Builders that assemble the application context from configuration.

pub mod context_builder;

pub use context_builder::{build_context, build_context_with_store, build_store, AppContext};
