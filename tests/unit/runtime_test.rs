//! Tests for tokio spawner utilities

use assistant_dispatch::core::Spawn;
use assistant_dispatch::runtime::tokio_spawner::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_dedicated_runtime_outlives_builder() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    let clone = spawner.clone();
    drop(spawner);

    let (tx, rx) = std::sync::mpsc::channel();
    clone.spawn(async move {
        tx.send("ran").unwrap();
    });
    assert_eq!(
        rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap(),
        "ran"
    );
}
