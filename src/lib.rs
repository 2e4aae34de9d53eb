//! Dorarelay: Telegram relay bot for media downloads
//!
//! Accepts download requests, fetches media through yt-dlp (or a direct HTTP
//! fetch for plain file links), and re-uploads it into the chat. A
//! canonical-link dedup cache serves repeat requests without re-downloading,
//! and a load-aware dispatcher spreads fresh downloads across a heterogeneous
//! worker pool.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, metrics, process control
//! - `storage`: settings database, canonical links, dedup cache
//! - `dispatch`: worker registry, weighted dispatch, task queue, worker loop
//! - `download`: external-downloader pipeline and progress reporting
//! - `telegram`: bot glue, transport seam, upload pipeline

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod download;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use dispatch::{dispatch, InMemoryBroker, Task, TaskKind, TaskQueue};
pub use storage::{DedupCache, UserSettings};
pub use telegram::{AppDeps, Bot};
