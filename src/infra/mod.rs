//! Infrastructure adapters for task stores and client notification.

pub mod notifier;
pub mod store;
pub use notifier::BroadcastNotifier;
pub use store::InMemoryStore;
pub use store::JsonlStore;
