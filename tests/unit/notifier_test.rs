//! Tests for the broadcast notifier

use assistant_dispatch::core::Notifier;
use assistant_dispatch::infra::BroadcastNotifier;

#[tokio::test]
async fn test_broadcast_without_clients() {
    let notifier = BroadcastNotifier::new(4);
    assert!(!notifier.has_recipients());
    assert!(!notifier.broadcast("nobody listening").await);
}

#[tokio::test]
async fn test_broadcast_reaches_every_client() {
    let notifier = BroadcastNotifier::new(4);
    let mut first = notifier.subscribe();
    let mut second = notifier.subscribe();
    assert!(notifier.has_recipients());
    assert_eq!(notifier.recipient_count(), 2);

    assert!(notifier.broadcast("good morning").await);
    assert_eq!(first.recv().await.unwrap(), "good morning");
    assert_eq!(second.recv().await.unwrap(), "good morning");

    drop(first);
    drop(second);
    assert!(!notifier.has_recipients());
}
