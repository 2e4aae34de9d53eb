//! Task queue: per-route pending-task queues plus worker registration.
//!
//! The in-memory broker keeps one FIFO queue per route. Enqueue is
//! synchronous admission; execution happens when a worker claims the task.
//! `purge_all` drops not-yet-claimed tasks only; in-flight work runs to
//! completion.

use crate::core::metrics;
use crate::dispatch::registry::{WorkerDescriptor, WorkerRegistry};
use crate::core::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use std::collections::{HashMap, VecDeque};
use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Maximum number of pending tasks across all routes, to bound memory.
const MAX_QUEUE_SIZE: usize = 1000;

/// What a task should do with its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Full media download via the external downloader
    Download,
    /// Audio-only extraction (`bestaudio` format hint)
    AudioExtract,
}

impl TaskKind {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Download => "download",
            TaskKind::AudioExtract => "audio",
        }
    }
}

/// One admitted download request.
///
/// Created on admission, destroyed when the pipeline completes or fails.
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique task identifier (UUID)
    pub id: String,
    /// Requesting chat
    pub chat_id: ChatId,
    /// Status message the pipeline edits with progress
    pub status_message_id: i32,
    /// Source URL
    pub url: String,
    /// Download or audio extraction
    pub kind: TaskKind,
    /// Admission timestamp
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task with a fresh UUID and the current timestamp.
    pub fn new(chat_id: ChatId, status_message_id: i32, url: String, kind: TaskKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id,
            status_message_id,
            url,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Broker surface the admission path and workers program against.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a task under the given route. Fails when the queue is full.
    async fn enqueue(&self, task: Task, route: &str) -> AppResult<()>;

    /// Claims the oldest pending task on the route, if any.
    async fn claim(&self, route: &str) -> Option<Task>;

    /// Drops every not-yet-claimed task. Returns the number dropped.
    async fn purge_all(&self) -> usize;

    /// Pending (unclaimed) tasks across all routes.
    async fn pending(&self) -> usize;
}

/// In-memory broker: route queues plus the worker registry in one place,
/// shared by every worker loop in the process.
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<Task>>>,
    workers: Mutex<Vec<WorkerDescriptor>>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Creates an empty broker with no routes and no registered workers.
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a worker under `(name, route, concurrency)`, replacing any
    /// previous registration with the same name.
    pub async fn register_worker(&self, descriptor: WorkerDescriptor) {
        let mut workers = self.workers.lock().await;
        workers.retain(|w| w.name != descriptor.name);
        info!(
            "Registered worker '{}' on route '{}' (concurrency {})",
            descriptor.name, descriptor.route, descriptor.concurrency
        );
        workers.push(descriptor);
    }

    /// Removes a worker registration by name.
    pub async fn deregister_worker(&self, name: &str) {
        let mut workers = self.workers.lock().await;
        let before = workers.len();
        workers.retain(|w| w.name != name);
        if workers.len() < before {
            info!("Deregistered worker '{}'", name);
        }
    }

    fn total_pending(queues: &HashMap<String, VecDeque<Task>>) -> usize {
        queues.values().map(|q| q.len()).sum()
    }
}

#[async_trait]
impl TaskQueue for InMemoryBroker {
    async fn enqueue(&self, task: Task, route: &str) -> AppResult<()> {
        let mut queues = self.queues.lock().await;

        let depth = Self::total_pending(&queues);
        if depth >= MAX_QUEUE_SIZE {
            log::warn!("Queue is full ({} tasks), rejecting task for {}", depth, task.url);
            return Err(AppError::Validation(format!(
                "Task queue is full ({} pending tasks)",
                depth
            )));
        }

        info!("Enqueueing task {} ({}) on route '{}'", task.id, task.kind.label(), route);
        queues.entry(route.to_string()).or_default().push_back(task);
        metrics::update_queue_depth(Self::total_pending(&queues));
        Ok(())
    }

    async fn claim(&self, route: &str) -> Option<Task> {
        let mut queues = self.queues.lock().await;
        let task = queues.get_mut(route).and_then(|q| q.pop_front());
        if task.is_some() {
            metrics::update_queue_depth(Self::total_pending(&queues));
        }
        task
    }

    async fn purge_all(&self) -> usize {
        let mut queues = self.queues.lock().await;
        let purged = Self::total_pending(&queues);
        queues.clear();
        metrics::update_queue_depth(0);
        info!("Purged {} pending tasks", purged);
        purged
    }

    async fn pending(&self) -> usize {
        let queues = self.queues.lock().await;
        Self::total_pending(&queues)
    }
}

#[async_trait]
impl WorkerRegistry for InMemoryBroker {
    async fn snapshot(&self) -> AppResult<Vec<WorkerDescriptor>> {
        Ok(self.workers.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(url: &str) -> Task {
        Task::new(ChatId(123), 1, url.to_string(), TaskKind::Download)
    }

    // ==================== Task tests ====================

    #[test]
    fn test_task_new_assigns_unique_ids() {
        let a = task("http://example.com/a");
        let b = task("http://example.com/a");
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    // ==================== Broker queue tests ====================

    #[tokio::test]
    async fn test_enqueue_and_claim_fifo_per_route() {
        let broker = InMemoryBroker::new();
        broker.enqueue(task("http://example.com/1"), "alpha").await.unwrap();
        broker.enqueue(task("http://example.com/2"), "alpha").await.unwrap();

        let first = broker.claim("alpha").await.unwrap();
        let second = broker.claim("alpha").await.unwrap();
        assert_eq!(first.url, "http://example.com/1");
        assert_eq!(second.url, "http://example.com/2");
        assert!(broker.claim("alpha").await.is_none());
    }

    #[tokio::test]
    async fn test_claim_only_sees_own_route() {
        let broker = InMemoryBroker::new();
        broker.enqueue(task("http://example.com/1"), "alpha").await.unwrap();

        assert!(broker.claim("beta").await.is_none());
        assert!(broker.claim("alpha").await.is_some());
    }

    #[tokio::test]
    async fn test_purge_all_drops_pending_and_reports_count() {
        let broker = InMemoryBroker::new();
        broker.enqueue(task("http://example.com/1"), "alpha").await.unwrap();
        broker.enqueue(task("http://example.com/2"), "beta").await.unwrap();

        assert_eq!(broker.purge_all().await, 2);
        assert_eq!(broker.pending().await, 0);
        assert!(broker.claim("alpha").await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_rejects_when_full() {
        let broker = InMemoryBroker::new();
        for i in 0..MAX_QUEUE_SIZE {
            broker
                .enqueue(task(&format!("http://example.com/{}", i)), "alpha")
                .await
                .unwrap();
        }

        let overflow = broker.enqueue(task("http://example.com/over"), "alpha").await;
        assert!(matches!(overflow, Err(AppError::Validation(_))));
    }

    // ==================== Worker registration tests ====================

    #[tokio::test]
    async fn test_register_and_snapshot_workers() {
        let broker = InMemoryBroker::new();
        broker.register_worker(WorkerDescriptor::new("a", "alpha", 3)).await;
        broker.register_worker(WorkerDescriptor::new("b", "beta", 1)).await;

        let snapshot = broker.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_reregistration_replaces_by_name() {
        let broker = InMemoryBroker::new();
        broker.register_worker(WorkerDescriptor::new("a", "alpha", 3)).await;
        broker.register_worker(WorkerDescriptor::new("a", "alpha", 8)).await;

        let snapshot = broker.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].concurrency, 8);
    }

    #[tokio::test]
    async fn test_deregister_removes_worker() {
        let broker = InMemoryBroker::new();
        broker.register_worker(WorkerDescriptor::new("a", "alpha", 3)).await;
        broker.deregister_worker("a").await;

        assert!(broker.snapshot().await.unwrap().is_empty());
    }
}
