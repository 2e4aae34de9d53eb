use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// Pipeline-internal errors (`Download`, `RepresentationRejected`, `CacheStale`)
/// are resolved inside the pipelines; only their terminal outcome reaches the
/// user-facing status message. Dispatch-level errors (`NoCapacity`,
/// `RegistryTimeout`) propagate to the admission caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Downloader (yt-dlp / direct fetch) errors, diagnostic already truncated
    #[error("Download error: {0}")]
    Download(String),

    /// Transport refused the chosen delivery representation
    #[error("Representation rejected: {0}")]
    RepresentationRejected(String),

    /// Artifact exceeds the transport's maximum payload size
    #[error("Payload too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Dispatcher found zero live workers
    #[error("No workers available to take the task")]
    NoCapacity,

    /// A cached artifact handle was rejected on re-delivery
    #[error("Cached artifact handle is stale")]
    CacheStale,

    /// Worker registry inspection did not return in time
    #[error("Worker registry inspection timed out")]
    RegistryTimeout,

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to convert String to AppError::Download
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Download(err)
    }
}

/// Helper function to convert &str to AppError::Download
impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Download(err.to_string())
    }
}

impl AppError {
    /// Whether this error is recoverable inside the pipeline (as opposed to
    /// a terminal failure the admission caller must see).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::RepresentationRejected(_) | AppError::CacheStale)
    }
}
