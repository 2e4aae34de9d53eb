use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Download folder path
/// Read from DOWNLOAD_FOLDER environment variable, defaults to ~/downloads.
/// Supports tilde (~) expansion for home directory.
pub static DOWNLOAD_FOLDER: Lazy<String> = Lazy::new(|| {
    let raw = env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "~/downloads".to_string());
    shellexpand::tilde(&raw).to_string()
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "database.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Archive chat for duplicating delivered artifacts.
/// Read from ARCHIVE_CHAT_ID environment variable; unset disables archiving.
pub static ARCHIVE_CHAT_ID: Lazy<Option<i64>> =
    Lazy::new(|| env::var("ARCHIVE_CHAT_ID").ok().and_then(|v| v.parse().ok()));

/// Name this worker registers under (also its dispatch route).
/// Read from WORKER_NAME environment variable, defaults to the hostname-less
/// "worker" so a single-process deployment still registers one route.
pub static WORKER_NAME: Lazy<String> = Lazy::new(|| env::var("WORKER_NAME").unwrap_or_else(|_| "worker".to_string()));

/// Whether routed dispatch is enabled.
/// Read from ENABLE_DISPATCH environment variable ("0"/"false" disables).
/// When disabled, tasks run directly on the admitting process without
/// worker selection.
pub static ENABLE_DISPATCH: Lazy<bool> = Lazy::new(|| {
    env::var("ENABLE_DISPATCH")
        .map(|v| !matches!(v.as_str(), "0" | "false" | "no"))
        .unwrap_or(true)
});

/// Admin user allowed to run /purge and /update.
/// Read from ADMIN_USER_ID environment variable; 0 disables admin commands.
pub static ADMIN_USER_ID: Lazy<i64> = Lazy::new(|| {
    env::var("ADMIN_USER_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
});

/// Dispatch configuration
pub mod dispatch {
    use super::Duration;

    /// Per-process bound on concurrently executing tasks, advertised to the
    /// registry as this worker's concurrency.
    pub const WORKER_CONCURRENCY: u32 = 4;

    /// Timeout for the worker registry inspection call (in seconds)
    pub const REGISTRY_TIMEOUT_SECS: u64 = 5;

    /// Registry inspection timeout duration
    pub fn registry_timeout() -> Duration {
        Duration::from_secs(REGISTRY_TIMEOUT_SECS)
    }

    /// Interval between worker claim-loop polls when the route queue is empty
    pub const CLAIM_POLL_MS: u64 = 200;

    /// Claim-loop poll interval duration
    pub fn claim_poll_interval() -> Duration {
        Duration::from_millis(CLAIM_POLL_MS)
    }
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Timeout for the whole yt-dlp invocation (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 600;

    /// Delay before cleaning up downloaded files (in seconds)
    pub const FILE_CLEANUP_DELAY_SECS: u64 = 600;

    /// Maximum length of a downloader diagnostic kept for user-facing messages
    pub const MAX_DIAGNOSTIC_BYTES: usize = 4000;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    /// File cleanup delay duration
    pub fn cleanup_delay() -> Duration {
        Duration::from_secs(FILE_CLEANUP_DELAY_SECS)
    }
}

/// Progress reporting configuration
pub mod progress {
    /// Minimum percentage-point change before another status edit is sent.
    /// Keeps the edit rate coarse so the observability channel is not flooded.
    pub const MIN_PERCENT_STEP: u8 = 5;
}

/// Payload validation configuration
pub mod validation {
    use std::env;

    /// Transport hard limit for a single uploaded payload: 2 GB.
    pub const MAX_PAYLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

    /// Maximum payload size, overridable via MAX_PAYLOAD_BYTES for local
    /// Bot API servers with raised limits.
    pub fn max_payload_bytes() -> u64 {
        env::var("MAX_PAYLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_PAYLOAD_BYTES)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// HTTP client timeout for Telegram API calls (in seconds).
    /// Large uploads need a generous window.
    pub const TIMEOUT_SECS: u64 = 600;

    /// HTTP client timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Periodic maintenance configuration
pub mod maintenance {
    use super::Duration;

    /// Interval between maintenance ticks (stale queue entries, depth metrics)
    pub const TICK_SECS: u64 = 900;

    /// Maintenance tick duration
    pub fn tick_interval() -> Duration {
        Duration::from_secs(TICK_SECS)
    }
}
