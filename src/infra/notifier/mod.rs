//! Client notification backends.

pub mod broadcast;

pub use broadcast::BroadcastNotifier;
