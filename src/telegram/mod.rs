//! Telegram integration: bot glue, the transport seam and the pipelines'
//! user-facing sides.

pub mod admin;
pub mod bot;
pub mod commands;
pub mod downloads;
pub mod transport;
pub mod uploads;

pub use bot::{create_bot, run_dispatcher};
pub use transport::{Artifact, FileHandle, TelegramTransport, Transport};

use crate::dispatch::queue::InMemoryBroker;
use crate::storage::cache::DedupCache;
use crate::storage::db::DbPool;
use std::sync::Arc;

/// The bot client type used throughout the crate.
pub type Bot = teloxide::Bot;

/// Process-wide dependencies, constructed once at startup and passed into
/// every handler and worker instead of living as module globals.
pub struct AppDeps {
    pub bot: Bot,
    pub bot_name: String,
    pub db_pool: Arc<DbPool>,
    pub cache: Arc<DedupCache>,
    pub broker: Arc<InMemoryBroker>,
    pub transport: TelegramTransport,
}
