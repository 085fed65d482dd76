use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    domain::{Identity, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{MediaKind, MediaPayload, MessagingCapabilities},
    },
    Error, Result,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Sent {
    Text {
        to: Identity,
        text: String,
    },
    Media {
        to: Identity,
        kind: MediaKind,
        file_name: String,
        caption: Option<String>,
    },
}

/// In-memory messenger that records every call.
#[derive(Default)]
pub(crate) struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    pub fail: bool,
}

impl RecordingMessenger {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text.clone()),
                Sent::Media { .. } => None,
            })
            .collect()
    }

    pub fn texts_to(&self, to: &Identity) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text { to: t, text } if t == to => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn all(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
            supports_media: true,
            supports_groups: true,
        }
    }

    async fn send_text(&self, to: &Identity, text: &str) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::External("send failed".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Text {
            to: to.clone(),
            text: text.to_string(),
        });
        Ok(MessageRef {
            to: to.clone(),
            message_id: format!("wamid.{}", sent.len()),
        })
    }

    async fn send_media(&self, to: &Identity, media: MediaPayload) -> Result<MessageRef> {
        if self.fail {
            return Err(Error::External("send failed".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Media {
            to: to.clone(),
            kind: media.kind,
            file_name: media.file_name,
            caption: media.caption,
        });
        Ok(MessageRef {
            to: to.clone(),
            message_id: format!("wamid.{}", sent.len()),
        })
    }
}
