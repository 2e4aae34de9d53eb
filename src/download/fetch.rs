//! Direct HTTP file fetch for plain file links the external downloader
//! would refuse (or only wrap pointlessly).

use crate::core::error::{AppError, AppResult};
use crate::download::progress::ProgressInfo;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use url::Url;

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    // The pattern is static; a failure here is a programming error.
    Regex::new(r#"filename="?([^";]+)"?"#).expect("content-disposition regex")
});

/// File extensions served as plain files, bypassing yt-dlp.
const DIRECT_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "ogg", "opus", "flac", "wav", "mp4", "mkv", "webm", "mov", "avi", "gif", "pdf", "zip", "apk",
];

/// Whether the URL points at a plain downloadable file.
pub fn is_direct_file_url(url: &Url) -> bool {
    Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| DIRECT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Picks the local filename: content-disposition header, then the URL's last
/// path segment, then the whole URL percent-encoded.
fn filename_for(url: &Url, content_disposition: Option<&str>) -> String {
    if let Some(cd) = content_disposition {
        if let Some(caps) = FILENAME_RE.captures(cd) {
            if let Some(name) = caps.get(1) {
                return name.as_str().to_string();
            }
        }
    }

    let from_path = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or("");
    if !from_path.is_empty() {
        return from_path.to_string();
    }

    url.as_str().replace(['/', ':', '?', '&', '='], "_")
}

/// Streams the file into `dest_dir`, reporting throttled progress when the
/// server sends a content length.
pub async fn direct_download(
    url: &Url,
    dest_dir: &Path,
    progress_tx: mpsc::UnboundedSender<ProgressInfo>,
) -> AppResult<Vec<PathBuf>> {
    log::info!("Direct fetch for {}", url);
    let response = reqwest::get(url.clone()).await?;
    if !response.status().is_success() {
        return Err(AppError::Download(format!(
            "Direct fetch failed with status {}",
            response.status()
        )));
    }

    let total = response.content_length();
    let content_disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = filename_for(url, content_disposition.as_deref());
    let filepath = dest_dir.join(&filename);

    let mut file = tokio::fs::File::create(&filepath).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_percent = 0u8;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total {
            let percent = ((downloaded as f64 / total as f64) * 100.0) as u8;
            if percent.saturating_sub(last_percent) >= crate::core::config::progress::MIN_PERCENT_STEP {
                last_percent = percent;
                let _ = progress_tx.send(ProgressInfo {
                    percent,
                    speed_mbs: None,
                    eta_seconds: None,
                    current_size: Some(downloaded),
                    total_size: Some(total),
                });
            }
        }
    }
    file.flush().await?;

    log::info!("Direct fetch complete: {} ({} bytes)", filename, downloaded);
    Ok(vec![filepath])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_is_direct_file_url() {
        assert!(is_direct_file_url(&url("https://example.com/files/song.mp3")));
        assert!(is_direct_file_url(&url("https://example.com/v.MP4?token=1")));
        assert!(!is_direct_file_url(&url("https://www.youtube.com/watch?v=abc")));
        assert!(!is_direct_file_url(&url("https://example.com/page")));
    }

    #[test]
    fn test_filename_from_content_disposition() {
        let u = url("https://example.com/dl?id=1");
        assert_eq!(
            filename_for(&u, Some(r#"attachment; filename="track.mp3""#)),
            "track.mp3"
        );
        assert_eq!(filename_for(&u, Some("attachment; filename=track.mp3")), "track.mp3");
    }

    #[test]
    fn test_filename_falls_back_to_path_segment() {
        assert_eq!(filename_for(&url("https://example.com/files/clip.mp4"), None), "clip.mp4");
    }

    #[test]
    fn test_filename_falls_back_to_encoded_url() {
        let name = filename_for(&url("https://example.com/"), None);
        assert!(!name.is_empty());
        assert!(!name.contains('/'));
    }
}
