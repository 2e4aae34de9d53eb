//! Throttled progress reporting into the user's status message.
//!
//! The pipelines stream coarse-grained updates here; the status message is
//! edited only when progress moved by a configured step, so the observability
//! channel is never flooded with per-chunk edits.

use crate::core::config;
use crate::core::utils::format_file_size;
use crate::telegram::Bot;
use teloxide::prelude::*;
use teloxide::types::MessageId;

/// One progress observation from a running download or upload.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    pub percent: u8,
    pub speed_mbs: Option<f64>,
    pub eta_seconds: Option<u64>,
    pub current_size: Option<u64>,
    pub total_size: Option<u64>,
}

/// Pipeline stage shown to the user.
#[derive(Debug, Clone)]
pub enum DownloadStatus {
    /// Download is starting
    Starting,
    /// Download in progress
    Downloading(ProgressInfo),
    /// Upload to the chat in progress
    Uploading,
    /// Everything delivered
    Success,
    /// Terminal failure with a user-facing (already truncated) diagnostic
    Error(String),
}

impl DownloadStatus {
    fn render(&self) -> String {
        match self {
            DownloadStatus::Starting => "Starting download...".to_string(),
            DownloadStatus::Downloading(info) => {
                let mut line = format!("Downloading... {}%", info.percent);
                if let (Some(current), Some(total)) = (info.current_size, info.total_size) {
                    line.push_str(&format!(" ({} / {})", format_file_size(current), format_file_size(total)));
                }
                if let Some(speed) = info.speed_mbs {
                    line.push_str(&format!(" at {:.1} MB/s", speed));
                }
                if let Some(eta) = info.eta_seconds {
                    line.push_str(&format!(", ETA {}s", eta));
                }
                line
            }
            DownloadStatus::Uploading => "Download complete. Sending now...".to_string(),
            DownloadStatus::Success => "Download success!✅".to_string(),
            DownloadStatus::Error(diag) => format!("Download failed!❌\n\n{}", diag),
        }
    }
}

/// Handle to the status message a pipeline keeps editing.
///
/// Throttles `Downloading` edits to the configured minimum percent step and
/// tolerates edit failures (a lost status edit must never fail the task).
pub struct ProgressMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    last_percent: Option<u8>,
}

impl ProgressMessage {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
            last_percent: None,
        }
    }

    /// Edits the status message for the new pipeline stage.
    ///
    /// Consecutive `Downloading` updates below the minimum step are skipped;
    /// every other stage transition is always shown.
    pub async fn update(&mut self, bot: &Bot, status: DownloadStatus) {
        if let DownloadStatus::Downloading(ref info) = status {
            if let Some(last) = self.last_percent {
                if info.percent.saturating_sub(last) < config::progress::MIN_PERCENT_STEP && info.percent < 100 {
                    return;
                }
            }
            self.last_percent = Some(info.percent);
        } else {
            self.last_percent = None;
        }

        if let Err(e) = bot.edit_message_text(self.chat_id, self.message_id, status.render()).await {
            log::debug!("Failed to edit status message {}: {}", self.message_id, e);
        }
    }
}
