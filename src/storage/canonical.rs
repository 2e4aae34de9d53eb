//! Canonical link derivation for the dedup cache.
//!
//! Two requests that would produce byte-identical artifacts must map to the
//! same key; requests whose settings change the produced representation must
//! map to different keys. Canonicalization is pure and deterministic.

use crate::storage::db::UserSettings;
use std::fmt;
use url::Url;

/// Stable content key for a piece of source material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Query parameters the downloader ignores: tracking noise, share tokens and
/// playback positions. Stripping them keeps superficially different links on
/// one cache entry.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "yclid",
    "igshid",
    "igsh",
    "si",
    "feature",
    "ref",
    "ref_src",
    "share_id",
    "t",
    "time_continue",
    "pp",
];

/// Normalizes a source URL into a stable content key.
///
/// YouTube-family links collapse onto the `watch?v=` form so that share
/// links, shorts links and embeds of the same video share one key. Every
/// other host keeps its path plus the non-tracking query parameters, sorted
/// for stability.
pub fn canonicalize(url: &Url) -> CanonicalKey {
    if let Some(video_id) = youtube_video_id(url) {
        return CanonicalKey(format!("https://www.youtube.com/watch?v={}", video_id));
    }

    let host = url.host_str().unwrap_or("").to_lowercase();
    let path = url.path().trim_end_matches('/');

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_str()))
        .collect();
    params.sort();

    let mut key = format!("{}://{}{}", url.scheme(), host, path);
    for (i, (k, v)) in params.iter().enumerate() {
        let sep = if i == 0 { '?' } else { '&' };
        key.push(sep);
        key.push_str(k);
        if !v.is_empty() {
            key.push('=');
            key.push_str(v);
        }
    }
    CanonicalKey(key)
}

/// Extracts the video id from the YouTube URL shapes we collapse.
fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string).filter(|s| !s.is_empty()),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
                Some("shorts") | Some("embed") | Some("live") => {
                    segments.next().map(str::to_string).filter(|s| !s.is_empty())
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// The delivery-affecting subset of the user's settings, encoded compactly.
///
/// Resolution and format both change the produced bytes; the dispatch mode
/// never does and is deliberately excluded. Widen the subset here if another
/// setting turns out to affect output.
pub fn delivery_discriminator(settings: &UserSettings) -> String {
    format!("{}{}", settings.resolution.as_str(), settings.format.as_str())
}

/// Appends the delivery discriminator so users with different output
/// preferences do not collide on one cache entry.
pub fn combine_with_settings(key: &CanonicalKey, settings: &UserSettings) -> CanonicalKey {
    CanonicalKey(format!("{}?p={}", key.0, delivery_discriminator(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::{DeliveryFormat, DispatchMode, ResolutionTier};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // ==================== canonicalize tests ====================

    #[test]
    fn test_tracking_params_are_stripped() {
        let with_noise = canonicalize(&url("https://example.com/v?t=123&id=9"));
        let clean = canonicalize(&url("https://example.com/v?id=9"));
        assert_eq!(with_noise, clean);
    }

    #[test]
    fn test_utm_and_share_tokens_are_stripped() {
        let a = canonicalize(&url(
            "https://example.com/watch?id=9&utm_source=tg&utm_campaign=x&fbclid=abc&si=XYZ",
        ));
        let b = canonicalize(&url("https://example.com/watch?id=9"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_params_are_kept() {
        let a = canonicalize(&url("https://example.com/v?id=9"));
        let b = canonicalize(&url("https://example.com/v?id=10"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_order_does_not_matter() {
        let a = canonicalize(&url("https://example.com/v?a=1&b=2"));
        let b = canonicalize(&url("https://example.com/v?b=2&a=1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonicalize_is_deterministic() {
        let u = url("https://example.com/path/to/v?id=9&x=1");
        assert_eq!(canonicalize(&u), canonicalize(&u));
    }

    #[test]
    fn test_youtube_variants_collapse() {
        let watch = canonicalize(&url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=share"));
        let short = canonicalize(&url("https://youtu.be/dQw4w9WgXcQ?si=AbCd"));
        let shorts = canonicalize(&url("https://youtube.com/shorts/dQw4w9WgXcQ"));
        let mobile = canonicalize(&url("https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42"));

        assert_eq!(watch, short);
        assert_eq!(watch, shorts);
        assert_eq!(watch, mobile);
        assert_eq!(watch.as_str(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_different_youtube_videos_stay_distinct() {
        let a = canonicalize(&url("https://youtu.be/dQw4w9WgXcQ"));
        let b = canonicalize(&url("https://youtu.be/aaaaaaaaaaa"));
        assert_ne!(a, b);
    }

    // ==================== combine_with_settings tests ====================

    #[test]
    fn test_differing_delivery_settings_produce_distinct_keys() {
        let key = canonicalize(&url("https://example.com/v?id=9"));
        let a = UserSettings {
            resolution: ResolutionTier::P1080,
            format: DeliveryFormat::Video,
            dispatch: DispatchMode::Queued,
        };
        let b = UserSettings {
            resolution: ResolutionTier::P720,
            format: DeliveryFormat::Video,
            dispatch: DispatchMode::Queued,
        };
        let c = UserSettings {
            resolution: ResolutionTier::P1080,
            format: DeliveryFormat::Document,
            dispatch: DispatchMode::Queued,
        };

        assert_ne!(combine_with_settings(&key, &a), combine_with_settings(&key, &b));
        assert_ne!(combine_with_settings(&key, &a), combine_with_settings(&key, &c));
    }

    #[test]
    fn test_dispatch_mode_does_not_affect_key() {
        let key = canonicalize(&url("https://example.com/v?id=9"));
        let queued = UserSettings {
            dispatch: DispatchMode::Queued,
            ..Default::default()
        };
        let direct = UserSettings {
            dispatch: DispatchMode::Direct,
            ..Default::default()
        };
        assert_eq!(combine_with_settings(&key, &queued), combine_with_settings(&key, &direct));
    }

    #[test]
    fn test_identical_settings_produce_identical_keys() {
        let key = canonicalize(&url("https://example.com/v?id=9"));
        let settings = UserSettings::default();
        assert_eq!(
            combine_with_settings(&key, &settings),
            combine_with_settings(&key, &settings)
        );
    }
}
