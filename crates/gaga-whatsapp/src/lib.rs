//! WhatsApp Cloud API adapter.
//!
//! Implements the `gaga-core` MessagingPort over the Graph API and exposes the
//! webhook router that feeds inbound messages to the bot.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

pub mod router;
pub mod webhook;

use gaga_core::{
    config::{Config, DEFAULT_API_BASE},
    domain::{Identity, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{MediaKind, MediaPayload, MessagingCapabilities},
    },
    Result,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct WhatsAppApiConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub api_base: String,
}

impl WhatsAppApiConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            access_token: cfg.whatsapp_access_token.clone(),
            phone_number_id: cfg.whatsapp_phone_number_id.clone(),
            api_base: cfg.whatsapp_api_base.clone(),
        }
    }
}

impl Default for WhatsAppApiConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WhatsAppMessenger {
    cfg: WhatsAppApiConfig,
    http: reqwest::Client,
}

impl WhatsAppMessenger {
    pub fn new(cfg: WhatsAppApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::External(format!("whatsapp client build error: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}",
            self.cfg.api_base.trim_end_matches('/'),
            self.cfg.phone_number_id
        )
    }

    fn recipient(to: &Identity) -> Result<&str> {
        if to.is_group() {
            return Err(Error::External(format!(
                "whatsapp cloud api cannot send to group {to}"
            )));
        }
        Ok(to.bare())
    }

    /// Send, retrying once on 429 after `Retry-After`.
    async fn with_retry(
        &self,
        build: impl Fn() -> Result<reqwest::RequestBuilder>,
    ) -> Result<Value> {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            let resp = build()?
                .bearer_auth(&self.cfg.access_token)
                .send()
                .await
                .map_err(|e| Error::External(format!("whatsapp request error: {e}")))?;

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempts < MAX_RETRIES {
                attempts += 1;
                let wait = retry_after(resp.headers()).unwrap_or(DEFAULT_RETRY_AFTER);
                warn!(wait_ms = wait.as_millis() as u64, "whatsapp rate limited, retrying");
                sleep(wait).await;
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::External(format!(
                    "whatsapp api error: {status} {}",
                    body.chars().take(200).collect::<String>()
                )));
            }
            return resp
                .json()
                .await
                .map_err(|e| Error::External(format!("whatsapp json error: {e}")));
        }
    }

    async fn post_message(&self, to: &Identity, body: Value) -> Result<MessageRef> {
        let url = self.endpoint("messages");
        let v = self
            .with_retry(|| Ok(self.http.post(&url).json(&body)))
            .await?;
        let message_id = v
            .pointer("/messages/0/id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| Error::External("whatsapp response missing message id".to_string()))?
            .to_string();
        debug!(to = %to, message_id = %message_id, "whatsapp message accepted");
        Ok(MessageRef {
            to: to.clone(),
            message_id,
        })
    }

    /// Upload bytes to the media endpoint and return the media id.
    async fn upload(&self, media: &MediaPayload) -> Result<String> {
        let url = self.endpoint("media");
        let v = self
            .with_retry(|| {
                let part = reqwest::multipart::Part::bytes(media.bytes.clone())
                    .file_name(media.file_name.clone())
                    .mime_str(&media.mime_type)
                    .map_err(|e| Error::External(format!("whatsapp multipart error: {e}")))?;
                let form = reqwest::multipart::Form::new()
                    .text("messaging_product", "whatsapp")
                    .text("type", media.mime_type.clone())
                    .part("file", part);
                Ok(self.http.post(&url).multipart(form))
            })
            .await?;
        v.get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::External("whatsapp upload returned no media id".to_string()))
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// `{"id": ..}` plus the caption/filename fields the media type accepts.
fn media_object(media_id: &str, media: &MediaPayload) -> Value {
    let mut obj = json!({ "id": media_id });
    match media.kind {
        MediaKind::Audio => {}
        MediaKind::Document => {
            obj["filename"] = json!(media.file_name);
            if let Some(c) = &media.caption {
                obj["caption"] = json!(c);
            }
        }
        MediaKind::Image | MediaKind::Video => {
            if let Some(c) = &media.caption {
                obj["caption"] = json!(c);
            }
        }
    }
    obj
}

#[async_trait]
impl MessagingPort for WhatsAppMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
            supports_media: true,
            supports_groups: false,
        }
    }

    async fn send_text(&self, to: &Identity, text: &str) -> Result<MessageRef> {
        let body = json!({
            "messaging_product": "whatsapp",
            "to": Self::recipient(to)?,
            "type": "text",
            "text": { "body": text },
        });
        self.post_message(to, body).await
    }

    async fn send_media(&self, to: &Identity, media: MediaPayload) -> Result<MessageRef> {
        let recipient = Self::recipient(to)?;
        let media_id = self.upload(&media).await?;
        let kind = media.kind.as_str();

        let mut body = json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": kind,
        });
        body[kind] = media_object(&media_id, &media);
        let sent = self.post_message(to, body).await?;

        // Audio messages carry no caption.
        if media.kind == MediaKind::Audio {
            if let Some(caption) = media.caption.as_deref().filter(|c| !c.is_empty()) {
                self.send_text(to, caption).await?;
            }
        }
        Ok(sent)
    }
}
