use async_trait::async_trait;

use crate::{domain::Identity, messaging::types::MediaPayload, Result};

/// Where fired reminders go. Delivery is best effort.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, to: &Identity, text: &str) -> Result<()>;
}

/// Source of the operator phone number list.
pub trait PrivilegedListProvider: Send + Sync {
    fn privileged_numbers(&self) -> Vec<String>;
}

/// Fixed list, usually `OWNER_NUMBERS` from the environment.
#[derive(Clone, Debug, Default)]
pub struct StaticPrivilegedList(pub Vec<String>);

impl PrivilegedListProvider for StaticPrivilegedList {
    fn privileged_numbers(&self) -> Vec<String> {
        self.0.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

/// Text completion backend (OpenAI, Gemini).
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn complete(&self, req: CompletionRequest) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MediaFetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    #[error("{0}")]
    Other(String),
}

/// Downloads remote media for re-sending.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<MediaPayload, MediaFetchError>;
}
