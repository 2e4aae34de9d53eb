//! yt-dlp invocation with streamed, throttled progress.
//!
//! The downloader boundary never panics and never leaks raw process errors:
//! failures come back as `AppError::Download` with a bounded diagnostic, and
//! the caller decides the user-facing messaging.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::truncate_diagnostic;
use crate::download::progress::ProgressInfo;
use crate::storage::db::ResolutionTier;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Parses progress from a yt-dlp output line.
/// Example: "[download]  45.2% of 10.00MiB at 500.00KiB/s ETA 00:10"
pub fn parse_progress(line: &str) -> Option<ProgressInfo> {
    if !line.contains("[download]") || !line.contains('%') {
        return None;
    }

    let mut percent = None;
    let mut speed_mbs = None;
    let mut eta_seconds = None;
    let mut total_size = None;

    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if let Some(stripped) = part.strip_suffix('%') {
            if let Ok(p) = stripped.parse::<f32>() {
                percent = Some(p.clamp(0.0, 100.0) as u8);
            }
        }

        // Total size: "of 10.00MiB" (sometimes "of ~10.00MiB")
        if *part == "of" && i + 1 < parts.len() {
            total_size = parse_size(parts[i + 1].trim_start_matches('~'));
        }

        // Speed: "at 500.00KiB/s"
        if *part == "at" && i + 1 < parts.len() {
            speed_mbs = parse_size(parts[i + 1]).map(|b| b as f64 / (1024.0 * 1024.0));
        }

        // ETA: "ETA 00:10"
        if *part == "ETA" && i + 1 < parts.len() {
            eta_seconds = parse_eta(parts[i + 1]);
        }
    }

    percent.map(|p| {
        let current_size = total_size.map(|total| (total as f64 * (f64::from(p) / 100.0)) as u64);
        ProgressInfo {
            percent: p,
            speed_mbs,
            eta_seconds,
            current_size,
            total_size,
        }
    })
}

/// Parses a size like "10.00MiB" or "500.00KiB" into bytes.
fn parse_size(size_str: &str) -> Option<u64> {
    let size_str = size_str.trim_end_matches("/s");
    for (suffix, factor) in [
        ("GiB", 1024.0 * 1024.0 * 1024.0),
        ("MiB", 1024.0 * 1024.0),
        ("KiB", 1024.0),
    ] {
        if let Some(num) = size_str.strip_suffix(suffix) {
            if let Ok(v) = num.parse::<f64>() {
                return Some((v * factor) as u64);
            }
        }
    }
    None
}

/// Parses an ETA like "00:10", "1:23" or "1:02:03" into seconds.
fn parse_eta(eta_str: &str) -> Option<u64> {
    let parts: Vec<&str> = eta_str.split(':').collect();
    match parts.as_slice() {
        [m, s] => Some(m.parse::<u64>().ok()? * 60 + s.parse::<u64>().ok()?),
        [h, m, s] => Some(h.parse::<u64>().ok()? * 3600 + m.parse::<u64>().ok()? * 60 + s.parse::<u64>().ok()?),
        _ => None,
    }
}

/// yt-dlp format selector for a resolution tier. `Best` lets yt-dlp choose.
pub fn format_for_resolution(tier: ResolutionTier) -> Option<String> {
    let height = match tier {
        ResolutionTier::Best => return None,
        ResolutionTier::P1080 => 1080,
        ResolutionTier::P720 => 720,
        ResolutionTier::P480 => 480,
    };
    Some(format!("bestvideo[height<={}]+bestaudio/best[height<={}]", height, height))
}

/// Runs the external downloader into `dest_dir`, streaming throttled progress
/// into `progress_tx`.
///
/// A playlist URL may produce several files; everything yt-dlp left in the
/// (task-private) destination directory is returned. On failure the stderr
/// tail is truncated to the configured bound and returned as
/// `AppError::Download`; nothing is raised past this boundary.
pub async fn run(
    url: &str,
    dest_dir: &Path,
    format_hint: Option<&str>,
    progress_tx: mpsc::UnboundedSender<ProgressInfo>,
) -> AppResult<Vec<PathBuf>> {
    let ytdl_bin = &*config::YTDL_BIN;
    let output_template = dest_dir.join("%(title)s.%(ext)s");

    let mut cmd = TokioCommand::new(ytdl_bin);
    cmd.arg("--newline")
        .arg("--no-warnings")
        .arg("-o")
        .arg(&output_template);
    if let Some(hint) = format_hint {
        cmd.arg("-f").arg(hint);
    }
    cmd.arg(url);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log::info!("Starting {} for {}", ytdl_bin, url);
    let mut child = cmd
        .spawn()
        .map_err(|e| AppError::Download(format!("Failed to start downloader '{}': {}", ytdl_bin, e)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Download("Downloader stdout unavailable".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Download("Downloader stderr unavailable".to_string()))?;

    // Drain stderr concurrently so the child never blocks on a full pipe.
    let stderr_handle = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let progress_task = async {
        let mut lines = BufReader::new(stdout).lines();
        let mut last_percent = 0u8;
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(info) = parse_progress(&line) {
                let step = info.percent.saturating_sub(last_percent);
                if step >= config::progress::MIN_PERCENT_STEP || info.percent == 100 {
                    last_percent = info.percent;
                    let _ = progress_tx.send(info);
                }
            }
        }
        child.wait().await
    };

    let status = match timeout(config::download::ytdlp_timeout(), progress_task).await {
        Ok(status) => status.map_err(|e| AppError::Download(format!("Downloader wait failed: {}", e)))?,
        Err(_) => {
            log::warn!("Downloader timed out for {}", url);
            return Err(AppError::Download(format!(
                "Download timed out after {}s",
                config::download::YTDLP_TIMEOUT_SECS
            )));
        }
    };

    if !status.success() {
        let stderr_text = stderr_handle.await.unwrap_or_default();
        log::error!("Downloader failed for {} (exit {:?})", url, status.code());
        return Err(AppError::Download(truncate_diagnostic(stderr_text.trim())));
    }

    let files = collect_output_files(dest_dir)?;
    if files.is_empty() {
        return Err(AppError::Download("Downloader produced no files".to_string()));
    }
    log::info!("Download complete: {} file(s) for {}", files.len(), url);
    Ok(files)
}

/// Lists the files the downloader produced, skipping partial-download leftovers.
fn collect_output_files(dest_dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dest_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && !matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("part") | Some("ytdl") | Some("tmp")
                )
        })
        .collect();
    files.sort();
    Ok(files)
}
