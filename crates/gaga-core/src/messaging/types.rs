use crate::domain::Identity;

/// A text-bearing message delivered by the transport.
///
/// Media messages arrive here with their caption as `text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message_id: String,
    /// Where replies go (the group for group messages).
    pub chat: Identity,
    pub sender: Identity,
    pub text: String,
    pub is_group: bool,
    pub display_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Document
        }
    }

    /// The message `type` used by the WhatsApp API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub caption: Option<String>,
}

/// Capabilities of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
    pub supports_media: bool,
    pub supports_groups: bool,
}
