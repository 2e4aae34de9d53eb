//! Load-aware worker dispatch.
//!
//! A coarse proportional heuristic, not a least-loaded scheduler: weights come
//! from each worker's statically declared concurrency, never from live queue
//! depth, so stale or noisy reports are tolerated. Every worker gets an
//! equal-share padding on top of its declared capacity, which keeps
//! low-concurrency (even zero-concurrency, i.e. misconfigured) workers
//! eligible instead of starved.

pub mod queue;
pub mod registry;
pub mod worker;

use crate::core::error::{AppError, AppResult};
use crate::core::metrics;
use rand::Rng;
use registry::{snapshot_with_timeout, WorkerDescriptor, WorkerRegistry};

pub use queue::{InMemoryBroker, Task, TaskKind, TaskQueue};

/// Builds the weighted route pool from a registry snapshot.
///
/// Each route appears `concurrency + padding` times, where
/// `padding = ceil(sum(concurrency) / workers)`, clamped to at least 1 so an
/// all-zero snapshot still yields a non-empty pool.
fn weighted_routes(workers: &[WorkerDescriptor]) -> AppResult<Vec<&str>> {
    if workers.is_empty() {
        return Err(AppError::NoCapacity);
    }

    let total: u32 = workers.iter().map(|w| w.concurrency).sum();
    let count = workers.len() as u32;
    let padding = total.div_ceil(count).max(1);

    let mut pool = Vec::with_capacity((total + padding * count) as usize);
    for w in workers {
        pool.extend(std::iter::repeat(w.route.as_str()).take((w.concurrency + padding) as usize));
    }
    Ok(pool)
}

/// Picks the worker route a pending task should be enqueued under.
///
/// Snapshots the registry (bounded by the registry timeout), builds the
/// weighted pool and samples one entry uniformly at random.
///
/// # Errors
///
/// * `NoCapacity` — no live workers registered
/// * `RegistryTimeout` — the registry inspection did not return in time
pub async fn dispatch(registry: &dyn WorkerRegistry) -> AppResult<String> {
    let started = std::time::Instant::now();
    let workers = snapshot_with_timeout(registry).await?;
    let pool = weighted_routes(&workers)?;

    let route = {
        let mut rng = rand::thread_rng();
        pool[rng.gen_range(0..pool.len())].to_string()
    };

    log::info!(
        "Selected worker route '{}' from pool of {} ({} workers) in {:.2}s",
        route,
        pool.len(),
        workers.len(),
        started.elapsed().as_secs_f64()
    );
    metrics::record_dispatch(&route);
    Ok(route)
}
