//! Scriptable in-memory transport for exercising the upload pipeline
//! without a live messaging session.

use async_trait::async_trait;
use dorarelay::telegram::transport::{
    Artifact, DeliveredMessage, FileHandle, SendMeta, Transport, TransportError,
};
use std::collections::HashSet;
use std::sync::Mutex;
use teloxide::types::{ChatId, MessageId};

/// Transport double that records every call and rejects scripted
/// representations the way the real transport rejects mismatched types.
pub struct MockTransport {
    /// Representation labels in call order ("document", "video", ...,
    /// plus "forward")
    pub calls: Mutex<Vec<String>>,
    reject_representation: HashSet<&'static str>,
    fail_other: HashSet<&'static str>,
    handle: String,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            reject_representation: HashSet::new(),
            fail_other: HashSet::new(),
            handle: "mock-file-handle".to_string(),
        }
    }

    /// Rejects these representations with a representation error.
    pub fn rejecting(mut self, representations: &[&'static str]) -> Self {
        self.reject_representation = representations.iter().copied().collect();
        self
    }

    /// Fails these representations with a non-representation error.
    pub fn failing(mut self, representations: &[&'static str]) -> Self {
        self.fail_other = representations.iter().copied().collect();
        self
    }

    /// Handle attached to delivered messages.
    pub fn with_handle(mut self, handle: &str) -> Self {
        self.handle = handle.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn attempt(&self, representation: &'static str, chat_id: ChatId) -> Result<DeliveredMessage, TransportError> {
        self.calls.lock().unwrap().push(representation.to_string());

        if self.reject_representation.contains(representation) {
            return Err(TransportError::Representation(format!(
                "type of file mismatch for {}",
                representation
            )));
        }
        if self.fail_other.contains(representation) {
            return Err(TransportError::Other("network unreachable".to_string()));
        }

        let next_id = self.calls.lock().unwrap().len() as i32;
        Ok(DeliveredMessage {
            chat_id,
            message_id: MessageId(next_id),
            handle: Some(FileHandle(self.handle.clone())),
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_document(
        &self,
        chat_id: ChatId,
        _artifact: &Artifact,
        _meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        self.attempt("document", chat_id)
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        _artifact: &Artifact,
        _meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        self.attempt("video", chat_id)
    }

    async fn send_audio(
        &self,
        chat_id: ChatId,
        _artifact: &Artifact,
        _meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        self.attempt("audio", chat_id)
    }

    async fn send_animation(
        &self,
        chat_id: ChatId,
        _artifact: &Artifact,
        _meta: &SendMeta,
    ) -> Result<DeliveredMessage, TransportError> {
        self.attempt("animation", chat_id)
    }

    async fn forward_message(
        &self,
        _to: ChatId,
        from: ChatId,
        _message_id: MessageId,
    ) -> Result<DeliveredMessage, TransportError> {
        self.calls.lock().unwrap().push("forward".to_string());
        Ok(DeliveredMessage {
            chat_id: from,
            message_id: MessageId(0),
            handle: None,
        })
    }
}
