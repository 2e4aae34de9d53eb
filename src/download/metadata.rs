//! Local media probing via ffprobe.
//!
//! Dimensions and duration attached to a send make the transport render the
//! artifact correctly (player controls, aspect ratio). Probing is best-effort:
//! a missing or failing ffprobe yields no metadata, never an error.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

const FFPROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Dimensions and duration of a local media file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_duration_secs(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|d| d.parse::<f64>().ok()).map(|d| d.round() as u32)
}

fn from_ffprobe(output: FfprobeOutput) -> MediaMetadata {
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let stream_duration = video.and_then(|s| parse_duration_secs(s.duration.as_deref()));
    let format_duration = output
        .format
        .as_ref()
        .and_then(|f| parse_duration_secs(f.duration.as_deref()));

    MediaMetadata {
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        duration_secs: stream_duration.or(format_duration),
    }
}

/// Probes a downloaded file for dimensions and duration.
pub async fn probe_media(path: &Path) -> MediaMetadata {
    let result = timeout(
        FFPROBE_TIMEOUT,
        TokioCommand::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output(),
    )
    .await;

    let output = match result {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            log::debug!("ffprobe failed for {} (exit {:?})", path.display(), output.status.code());
            return MediaMetadata::default();
        }
        Ok(Err(e)) => {
            log::debug!("ffprobe unavailable: {}", e);
            return MediaMetadata::default();
        }
        Err(_) => {
            log::warn!("ffprobe timed out for {}", path.display());
            return MediaMetadata::default();
        }
    };

    match serde_json::from_slice::<FfprobeOutput>(&output.stdout) {
        Ok(parsed) => from_ffprobe(parsed),
        Err(e) => {
            log::debug!("Failed to parse ffprobe output for {}: {}", path.display(), e);
            MediaMetadata::default()
        }
    }
}
