//! Integration tests for dispatch over the in-memory broker.
//!
//! Run with: cargo test --test dispatch_test

use dorarelay::core::AppError;
use dorarelay::dispatch::queue::{InMemoryBroker, Task, TaskKind, TaskQueue};
use dorarelay::dispatch::registry::WorkerDescriptor;
use dorarelay::dispatch::dispatch;
use std::collections::HashMap;
use teloxide::types::ChatId;

fn task(url: &str) -> Task {
    Task::new(ChatId(1), 1, url.to_string(), TaskKind::Download)
}

#[tokio::test]
async fn test_dispatch_over_empty_broker_is_no_capacity() {
    let broker = InMemoryBroker::new();
    let result = dispatch(&broker).await;
    assert!(matches!(result, Err(AppError::NoCapacity)));
}

#[tokio::test]
async fn test_dispatch_then_enqueue_then_claim() {
    let broker = InMemoryBroker::new();
    broker.register_worker(WorkerDescriptor::new("alpha", "alpha", 2)).await;

    let route = dispatch(&broker).await.unwrap();
    assert_eq!(route, "alpha");

    broker.enqueue(task("https://example.com/v?id=1"), &route).await.unwrap();
    let claimed = broker.claim(&route).await.unwrap();
    assert_eq!(claimed.url, "https://example.com/v?id=1");
}

#[tokio::test]
async fn test_dispatch_spreads_proportionally_to_declared_capacity() {
    // {A:3, B:1} → padding ceil(4/2)=2 → weights {A:5, B:3}.
    let broker = InMemoryBroker::new();
    broker.register_worker(WorkerDescriptor::new("a", "a", 3)).await;
    broker.register_worker(WorkerDescriptor::new("b", "b", 1)).await;

    let trials = 10_000u32;
    let mut picks: HashMap<String, u32> = HashMap::new();
    for _ in 0..trials {
        let route = dispatch(&broker).await.unwrap();
        *picks.entry(route).or_insert(0) += 1;
    }

    let a_share = f64::from(picks["a"]) / f64::from(trials);
    assert!(
        (a_share - 0.625).abs() < 0.03,
        "expected ~5:3 split, route 'a' got share {:.4}",
        a_share
    );
    assert!(picks["b"] > 0, "low-capacity worker must not starve");
}

#[tokio::test]
async fn test_zero_concurrency_workers_remain_eligible() {
    let broker = InMemoryBroker::new();
    broker.register_worker(WorkerDescriptor::new("a", "a", 0)).await;
    broker.register_worker(WorkerDescriptor::new("b", "b", 0)).await;

    // Padding keeps all-zero registries dispatchable; repeated calls hit
    // both routes eventually.
    let mut seen = std::collections::HashSet::new();
    for _ in 0..200 {
        seen.insert(dispatch(&broker).await.unwrap());
    }
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_purge_drops_pending_across_routes() {
    let broker = InMemoryBroker::new();
    broker.register_worker(WorkerDescriptor::new("a", "a", 1)).await;
    broker.register_worker(WorkerDescriptor::new("b", "b", 1)).await;

    broker.enqueue(task("https://example.com/1"), "a").await.unwrap();
    broker.enqueue(task("https://example.com/2"), "b").await.unwrap();
    broker.enqueue(task("https://example.com/3"), "b").await.unwrap();

    assert_eq!(broker.purge_all().await, 3);
    assert!(broker.claim("a").await.is_none());
    assert!(broker.claim("b").await.is_none());
}
