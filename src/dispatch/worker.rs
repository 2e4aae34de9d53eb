//! Worker claim loop.
//!
//! Each worker pulls tasks from its own route queue and executes them with
//! bounded concurrency. Network I/O inside one task never blocks unrelated
//! tasks beyond this worker's own concurrency limit.

use crate::core::config;
use crate::dispatch::queue::TaskQueue;
use crate::dispatch::registry::WorkerDescriptor;
use crate::telegram::{downloads, AppDeps};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Spawns the claim loop for one worker.
///
/// The loop claims the oldest task on the worker's route, waits for a
/// concurrency permit and runs the task on its own tokio task. A claimed
/// task always runs to completion or failure; there is no mid-flight
/// cancellation.
pub fn spawn_worker(deps: Arc<AppDeps>, descriptor: WorkerDescriptor) -> JoinHandle<()> {
    tokio::spawn(async move {
        let permits = descriptor.concurrency.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(permits));
        log::info!(
            "Worker '{}' consuming route '{}' with {} slots",
            descriptor.name,
            descriptor.route,
            permits
        );

        loop {
            // Hold a slot before claiming, so tasks this worker cannot start
            // yet stay visible on the shared queue.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                // Semaphore closed only on shutdown
                return;
            };
            match deps.broker.claim(&descriptor.route).await {
                Some(task) => {
                    let deps = Arc::clone(&deps);
                    tokio::spawn(async move {
                        let _permit = permit;
                        downloads::run_task(&deps, task).await;
                    });
                }
                None => {
                    drop(permit);
                    tokio::time::sleep(config::dispatch::claim_poll_interval()).await;
                }
            }
        }
    })
}
