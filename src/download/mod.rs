//! Download pipeline: the external downloader, the direct HTTP fetch and
//! throttled progress reporting.

pub mod downloader;
pub mod fetch;
pub mod metadata;
pub mod progress;

pub use progress::{DownloadStatus, ProgressInfo, ProgressMessage};

use crate::core::error::AppResult;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use url::Url;

/// Runs whichever fetch path fits the URL: plain file links stream straight
/// over HTTP, everything else goes through the external downloader.
pub async fn run(
    url: &Url,
    dest_dir: &Path,
    format_hint: Option<&str>,
    progress_tx: mpsc::UnboundedSender<ProgressInfo>,
) -> AppResult<Vec<PathBuf>> {
    if fetch::is_direct_file_url(url) {
        fetch::direct_download(url, dest_dir, progress_tx).await
    } else {
        downloader::run(url.as_str(), dest_dir, format_hint, progress_tx).await
    }
}
