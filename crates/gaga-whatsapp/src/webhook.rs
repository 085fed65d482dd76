//! Inbound webhook payloads and verification.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use gaga_core::{
    domain::{Identity, USER_SUFFIX},
    messaging::types::IncomingMessage,
};

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub wa_id: String,
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ContactProfile {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<TextBody>,
    pub image: Option<MediaBody>,
    pub video: Option<MediaBody>,
    pub document: Option<MediaBody>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaBody {
    pub caption: Option<String>,
}

impl WebhookMessage {
    /// Text body, or the caption of a captioned media message.
    fn text(&self) -> Option<&str> {
        if let Some(t) = &self.text {
            return Some(t.body.as_str());
        }
        [&self.image, &self.video, &self.document]
            .into_iter()
            .flatten()
            .find_map(|m| m.caption.as_deref())
    }
}

/// Flatten a webhook delivery into the messages the bot should see.
/// Status updates and messages without text are skipped.
pub fn extract_messages(payload: &WebhookPayload) -> Vec<IncomingMessage> {
    let mut out = Vec::new();
    for change in payload.entry.iter().flat_map(|e| e.changes.iter()) {
        let value = &change.value;
        for msg in &value.messages {
            let Some(text) = msg.text() else {
                continue;
            };
            let display_name = value
                .contacts
                .iter()
                .find(|c| c.wa_id == msg.from)
                .and_then(|c| c.profile.as_ref())
                .and_then(|p| p.name.clone());
            let sender = Identity::from_jid(format!("{}{USER_SUFFIX}", msg.from));
            out.push(IncomingMessage {
                message_id: msg.id.clone(),
                chat: sender.clone(),
                sender,
                text: text.to_string(),
                is_group: false,
                display_name,
            });
        }
    }
    out
}

/// `hub.challenge` to echo back, when the subscription request is valid.
pub fn verify_subscription<'a>(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&'a str>,
    expected_token: &str,
) -> Option<&'a str> {
    if mode != Some("subscribe") || expected_token.is_empty() || token != Some(expected_token) {
        return None;
    }
    challenge
}

/// Check `X-Hub-Signature-256: sha256=<hex>` against the raw body.
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_sig) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub(crate) fn sign(app_secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
