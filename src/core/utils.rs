//! Small shared helpers: size formatting and diagnostic truncation.

use crate::core::config;

/// Formats a byte count into a human-readable size string.
///
/// # Example
///
/// ```
/// use dorarelay::core::utils::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 B");
/// assert_eq!(format_file_size(2 * 1024 * 1024), "2.00 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncates downloader diagnostics to the configured bound, keeping the
/// head of the message (yt-dlp prints the decisive error first).
///
/// Truncation is UTF-8 safe: cuts back to the nearest character boundary.
pub fn truncate_diagnostic(text: &str) -> String {
    let max = config::download::MAX_DIAGNOSTIC_BYTES;
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
