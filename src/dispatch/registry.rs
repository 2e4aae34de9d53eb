//! Worker registry: live-worker discovery behind a trait seam.
//!
//! The dispatcher only ever sees a point-in-time snapshot. A worker that
//! disappears between snapshot and execution is the queue's problem (retry /
//! redelivery), not the dispatcher's.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use async_trait::async_trait;
use tokio::time::timeout;

/// One live worker as advertised to the registry.
///
/// Ephemeral: rebuilt on every dispatch decision, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerDescriptor {
    /// Worker name (display/diagnostics)
    pub name: String,
    /// Route tasks for this worker are enqueued under
    pub route: String,
    /// Advertised concurrency capacity. Zero is legal (a misconfigured
    /// worker still registers); the dispatcher's padding keeps it eligible.
    pub concurrency: u32,
}

impl WorkerDescriptor {
    pub fn new(name: impl Into<String>, route: impl Into<String>, concurrency: u32) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            concurrency,
        }
    }
}

/// Source of live-worker snapshots.
///
/// Implemented by the in-memory broker; a broker-backed deployment would
/// implement it over the broker's inspection call.
#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// Returns a point-in-time view of the live workers.
    async fn snapshot(&self) -> AppResult<Vec<WorkerDescriptor>>;
}

/// Snapshots the registry under the configured timeout.
///
/// A slow or unresponsive registry is a `RegistryTimeout`, never a hang:
/// task admission must not block indefinitely.
pub async fn snapshot_with_timeout(registry: &dyn WorkerRegistry) -> AppResult<Vec<WorkerDescriptor>> {
    timeout(config::dispatch::registry_timeout(), registry.snapshot())
        .await
        .map_err(|_| AppError::RegistryTimeout)?
}
