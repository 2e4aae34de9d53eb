//! Messaging transport seam.
//!
//! The upload pipeline programs against the `Transport` trait so the
//! representation-fallback logic is testable without a live Telegram session.
//! `TelegramTransport` is the production implementation over teloxide.

use async_trait::async_trait;
use std::path::PathBuf;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, MessageId};
use thiserror::Error;

use crate::telegram::Bot;

/// Opaque transport-assigned identifier for previously uploaded content.
/// Re-usable to re-send without re-uploading bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle(pub String);

/// What the pipeline is delivering: a freshly downloaded local file, or a
/// remote handle from the dedup cache.
#[derive(Debug, Clone)]
pub enum Artifact {
    Local(PathBuf),
    Remote(FileHandle),
}

/// Optional metadata attached to a send.
#[derive(Debug, Clone, Default)]
pub struct SendMeta {
    pub caption: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
    pub thumbnail: Option<PathBuf>,
}

/// Transport-side failure, split by what the pipeline can do about it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport refused this delivery representation for this content.
    /// Recoverable via the pipeline's one-step fallback.
    #[error("representation rejected: {0}")]
    Representation(String),

    /// Anything else (network, auth, flood limits). Not a fallback trigger.
    #[error("transport error: {0}")]
    Other(String),
}

/// A successfully delivered message.
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Transport-assigned handle for the delivered media, when the transport
    /// reported one.
    pub handle: Option<FileHandle>,
}

/// The messaging operations the pipelines need.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_document(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError>;

    async fn send_video(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError>;

    async fn send_audio(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError>;

    async fn send_animation(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError>;

    /// Duplicates an already delivered message into another chat.
    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<DeliveredMessage, TransportError>;
}

/// API error fragments that mean "wrong message type for this content",
/// as opposed to transient failures. Matched case-insensitively.
const REPRESENTATION_ERROR_MARKERS: &[&str] = &[
    "type of file mismatch",
    "wrong file identifier",
    "can't use file of type",
    "wrong type of the web page content",
    "video_file_invalid",
    "photo_invalid_dimensions",
];

fn classify_send_error(err: teloxide::RequestError) -> TransportError {
    let text = err.to_string();
    let lower = text.to_lowercase();
    if REPRESENTATION_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        TransportError::Representation(text)
    } else {
        TransportError::Other(text)
    }
}

/// Extracts the transport-assigned media handle from a sent message,
/// whichever representation the message ended up as.
pub fn handle_from_message(msg: &Message) -> Option<FileHandle> {
    msg.document()
        .map(|d| d.file.id.0.clone())
        .or_else(|| msg.video().map(|v| v.file.id.0.clone()))
        .or_else(|| msg.audio().map(|a| a.file.id.0.clone()))
        .or_else(|| msg.animation().map(|a| a.file.id.0.clone()))
        .map(FileHandle)
}

fn delivered(msg: Message) -> DeliveredMessage {
    DeliveredMessage {
        chat_id: msg.chat.id,
        message_id: msg.id,
        handle: handle_from_message(&msg),
    }
}

fn input_file(artifact: &Artifact) -> InputFile {
    match artifact {
        Artifact::Local(path) => InputFile::file(path.clone()),
        Artifact::Remote(handle) => InputFile::file_id(FileId(handle.0.clone())),
    }
}

/// Production transport over the teloxide bot client.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_document(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        let mut req = self.bot.send_document(chat_id, input_file(artifact));
        if let Some(ref caption) = meta.caption {
            req = req.caption(caption.clone());
        }
        if let Some(ref thumb) = meta.thumbnail {
            req = req.thumbnail(InputFile::file(thumb.clone()));
        }
        req.await.map(delivered).map_err(classify_send_error)
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        let mut req = self.bot.send_video(chat_id, input_file(artifact)).supports_streaming(true);
        if let Some(ref caption) = meta.caption {
            req = req.caption(caption.clone());
        }
        if let Some(w) = meta.width {
            req = req.width(w);
        }
        if let Some(h) = meta.height {
            req = req.height(h);
        }
        if let Some(d) = meta.duration_secs {
            req = req.duration(d);
        }
        if let Some(ref thumb) = meta.thumbnail {
            req = req.thumbnail(InputFile::file(thumb.clone()));
        }
        req.await.map(delivered).map_err(classify_send_error)
    }

    async fn send_audio(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        let mut req = self.bot.send_audio(chat_id, input_file(artifact));
        if let Some(ref caption) = meta.caption {
            req = req.caption(caption.clone());
        }
        if let Some(d) = meta.duration_secs {
            req = req.duration(d);
        }
        req.await.map(delivered).map_err(classify_send_error)
    }

    async fn send_animation(
        &self,
        chat_id: ChatId,
        artifact: &Artifact,
        meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        let mut req = self.bot.send_animation(chat_id, input_file(artifact));
        if let Some(ref caption) = meta.caption {
            req = req.caption(caption.clone());
        }
        req.await.map(delivered).map_err(classify_send_error)
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<DeliveredMessage, TransportError> {
        self.bot
            .forward_message(to, from, message_id)
            .await
            .map(delivered)
            .map_err(classify_send_error)
    }
}
