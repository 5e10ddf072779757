//! Notifier over a tokio broadcast channel.
//!
//! Each receiver handed out by [`BroadcastNotifier::subscribe`] stands for one
//! connected client; the transport layer forwards what it receives.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::core::Notifier;

/// Fan-out notifier whose subscribers are the connected clients.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<String>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` messages per lagging client.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a client.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn recipient_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn broadcast(&self, message: &str) -> bool {
        match self.sender.send(message.to_string()) {
            Ok(clients) => {
                debug!(clients, "broadcast delivered");
                true
            }
            Err(_) => false,
        }
    }

    fn has_recipients(&self) -> bool {
        self.recipient_count() > 0
    }
}
