use async_trait::async_trait;

use crate::{
    domain::{Identity, MessageRef},
    messaging::types::{MediaPayload, MessagingCapabilities},
    Result,
};

/// Outbound messaging port.
///
/// WhatsApp Cloud API is the production implementation; decorators
/// (throttling, branding) wrap any implementation.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, to: &Identity, text: &str) -> Result<MessageRef>;

    async fn send_media(&self, to: &Identity, media: MediaPayload) -> Result<MessageRef>;
}
