//! Upload pipeline: representation selection, one-step fallback, size guard,
//! cache population and the archive side channel.

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::metrics;
use crate::core::utils::format_file_size;
use crate::dispatch::queue::Task;
use crate::storage::canonical::{canonicalize, combine_with_settings};
use crate::storage::cache::DedupCache;
use crate::storage::db::{DeliveryFormat, UserSettings};
use crate::telegram::transport::{Artifact, DeliveredMessage, SendMeta, Transport, TransportError};
use teloxide::types::ChatId;
use url::Url;

/// Transport message type an artifact is delivered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Document,
    Video,
    Audio,
    Animation,
}

impl Representation {
    /// Maps the user's delivery preference onto the initial representation.
    pub fn from_format(format: DeliveryFormat) -> Self {
        match format {
            DeliveryFormat::Document => Self::Document,
            DeliveryFormat::Audio => Self::Audio,
            DeliveryFormat::Video => Self::Video,
        }
    }

    /// The single fallback step after a representation rejection.
    /// No chain: a fallback's fallback is None.
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Document => Some(Self::Video),
            Self::Video => Some(Self::Animation),
            Self::Audio | Self::Animation => None,
        }
    }

    /// Label for logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Animation => "animation",
        }
    }
}

/// Outcome of a completed delivery.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub message: DeliveredMessage,
    pub representation: Representation,
}

async fn send_as<T: Transport + ?Sized>(
    transport: &T,
    representation: Representation,
    chat_id: ChatId,
    artifact: &Artifact,
    meta: &SendMeta,
) -> Result<DeliveredMessage, TransportError> {
    match representation {
        Representation::Document => transport.send_document(chat_id, artifact, meta).await,
        Representation::Video => transport.send_video(chat_id, artifact, meta).await,
        Representation::Audio => transport.send_audio(chat_id, artifact, meta).await,
        Representation::Animation => transport.send_animation(chat_id, artifact, meta).await,
    }
}

/// Attempts the primary representation, falling back exactly once on a
/// transport-side representation rejection. A second rejection, or any
/// non-representation error, is terminal.
async fn attempt_with_fallback<T: Transport + ?Sized>(
    transport: &T,
    primary: Representation,
    chat_id: ChatId,
    artifact: &Artifact,
    meta: &SendMeta,
) -> AppResult<Delivered> {
    match send_as(transport, primary, chat_id, artifact, meta).await {
        Ok(message) => Ok(Delivered {
            message,
            representation: primary,
        }),
        Err(TransportError::Representation(reason)) => {
            let Some(fallback) = primary.fallback() else {
                log::error!("{} rejected with no fallback available: {}", primary.label(), reason);
                return Err(AppError::RepresentationRejected(reason));
            };
            log::warn!(
                "{} rejected ({}), retrying once as {}",
                primary.label(),
                reason,
                fallback.label()
            );
            match send_as(transport, fallback, chat_id, artifact, meta).await {
                Ok(message) => Ok(Delivered {
                    message,
                    representation: fallback,
                }),
                Err(TransportError::Representation(second)) => {
                    log::error!("Fallback {} also rejected: {}", fallback.label(), second);
                    Err(AppError::RepresentationRejected(second))
                }
                Err(TransportError::Other(e)) => Err(AppError::Download(format!("Failed to deliver: {}", e))),
            }
        }
        Err(TransportError::Other(e)) => Err(AppError::Download(format!("Failed to deliver: {}", e))),
    }
}

/// Caption for a delivered artifact: filename, source link, size and which
/// worker produced it.
fn gen_caption(task: &Task, artifact: &Artifact) -> String {
    let mut caption = String::new();
    if let Artifact::Local(path) = artifact {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            caption.push_str(name);
            caption.push('\n');
        }
        if let Ok(meta) = std::fs::metadata(path) {
            caption.push_str(&format!("filesize: {}\n", format_file_size(meta.len())));
        }
    }
    caption.push_str(&task.url);
    let worker = &*config::WORKER_NAME;
    if !worker.is_empty() {
        caption.push_str(&format!("\n\nDownloaded by {}", worker));
    }
    caption
}

/// Delivers an artifact to the requesting chat.
///
/// `meta` carries whatever dimensions/duration/thumbnail the caller probed;
/// a caption is generated when none was provided.
///
/// Oversized local artifacts are never attempted: there is no fallback
/// transport for them, the caller is told and the pipeline stops. On success
/// the dedup cache learns the transport handle, the success metric is
/// incremented, and, when an archive chat is configured, the delivered
/// message is duplicated there; archive failure never fails the delivery.
pub async fn deliver<T: Transport + ?Sized>(
    transport: &T,
    task: &Task,
    artifact: &Artifact,
    settings: &UserSettings,
    cache: &DedupCache,
    mut meta: SendMeta,
) -> AppResult<Delivered> {
    if let Artifact::Local(path) = artifact {
        let size = std::fs::metadata(path)?.len();
        let limit = config::validation::max_payload_bytes();
        if size > limit {
            log::warn!(
                "Artifact {} too large: {} (limit {})",
                path.display(),
                format_file_size(size),
                format_file_size(limit)
            );
            metrics::record_upload_failure("payload_too_large");
            return Err(AppError::PayloadTooLarge { size, limit });
        }
    }

    if meta.caption.is_none() {
        meta.caption = Some(gen_caption(task, artifact));
    }
    let primary = Representation::from_format(settings.format);

    let result = attempt_with_fallback(transport, primary, task.chat_id, artifact, &meta).await;
    let delivered = match result {
        Ok(d) => d,
        Err(e) => {
            metrics::record_upload_failure(match &e {
                AppError::RepresentationRejected(_) => "representation_rejected",
                _ => "send_failed",
            });
            return Err(e);
        }
    };

    log::info!(
        "Delivered {} as {} to chat {}",
        task.url,
        delivered.representation.label(),
        task.chat_id
    );
    metrics::record_upload_success(delivered.representation.label());

    if let Ok(url) = Url::parse(&task.url) {
        if let Some(ref handle) = delivered.message.handle {
            let key = combine_with_settings(&canonicalize(&url), settings);
            cache.put(key, handle.clone()).await;
        } else {
            log::warn!("Transport returned no file handle for {}; not cached", task.url);
        }
    }

    // Archive side channel applies to fresh uploads only; failure is logged
    // and swallowed.
    if let Artifact::Local(_) = artifact {
        if let Some(archive_id) = *config::ARCHIVE_CHAT_ID {
            if let Err(e) = transport
                .forward_message(ChatId(archive_id), delivered.message.chat_id, delivered.message.message_id)
                .await
            {
                log::warn!("Failed to duplicate delivery into archive chat: {}", e);
            }
        }
    }

    Ok(delivered)
}

/// Re-sends a previously uploaded artifact if the cache knows one.
///
/// * `Ok(Some(_))` — delivered from cache, `cache_hit` counted, no download.
/// * `Ok(None)` — nothing cached, `cache_miss` counted.
/// * `Err(CacheStale)` — a cached handle was rejected; the entry has been
///   invalidated and `cache_miss` counted. The caller falls back to a fresh
///   download, invisible to the user beyond the added latency.
pub async fn resend_cached<T: Transport + ?Sized>(
    transport: &T,
    task: &Task,
    settings: &UserSettings,
    cache: &DedupCache,
) -> AppResult<Option<Delivered>> {
    let url = Url::parse(&task.url)?;
    let key = combine_with_settings(&canonicalize(&url), settings);

    let Some(handle) = cache.lookup(&key).await else {
        metrics::record_cache_miss();
        return Ok(None);
    };

    let artifact = Artifact::Remote(handle);
    let meta = SendMeta {
        caption: Some(gen_caption(task, &artifact)),
        ..Default::default()
    };
    let primary = Representation::from_format(settings.format);

    match attempt_with_fallback(transport, primary, task.chat_id, &artifact, &meta).await {
        Ok(delivered) => {
            log::info!("Cache hit: re-sent {} without re-downloading", task.url);
            metrics::record_cache_hit();
            metrics::record_upload_success(delivered.representation.label());
            Ok(Some(delivered))
        }
        Err(e) => {
            // The handle expired or was revoked on the transport side; drop
            // it and have the caller re-download.
            log::warn!("Cached handle rejected for {} ({}); invalidating", task.url, e);
            cache.invalidate(&key).await;
            metrics::record_cache_miss();
            Err(AppError::CacheStale)
        }
    }
}
