use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{Identity, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{MediaPayload, MessagingCapabilities},
    },
    Result,
};

/// Appends the brand signature to every outgoing text and media caption.
pub struct BrandedMessenger {
    inner: Arc<dyn MessagingPort>,
    signature: String,
}

impl BrandedMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, signature: impl Into<String>) -> Self {
        Self {
            inner,
            signature: signature.into(),
        }
    }

    /// Characters the signature adds to each message.
    pub fn overhead(&self) -> usize {
        self.signature.chars().count()
    }

    fn sign(&self, text: &str) -> String {
        if self.signature.is_empty() || text.ends_with(self.signature.as_str()) {
            return text.to_string();
        }
        format!("{text}{}", self.signature)
    }
}

#[async_trait]
impl MessagingPort for BrandedMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        let mut caps = self.inner.capabilities();
        caps.max_message_len = caps.max_message_len.saturating_sub(self.overhead());
        caps
    }

    async fn send_text(&self, to: &Identity, text: &str) -> Result<MessageRef> {
        self.inner.send_text(to, &self.sign(text)).await
    }

    async fn send_media(&self, to: &Identity, mut media: MediaPayload) -> Result<MessageRef> {
        media.caption = media.caption.map(|c| self.sign(&c));
        self.inner.send_media(to, media).await
    }
}
