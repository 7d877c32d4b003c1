//! Messaging client abstraction
//!
//! The download pipeline only talks to the platform through [`MediaClient`],
//! using the plain message model defined here. `telegram::bot` implements it
//! on top of teloxide; tests implement it with an in-memory recorder.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Address of a message that can be edited or replied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self { chat_id, message_id }
    }
}

/// Kind of media attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Document,
    Audio,
    Video,
    Voice,
    Animation,
}

impl MediaKind {
    /// Extension used when nothing better is known
    pub fn default_extension(self) -> &'static str {
        match self {
            MediaKind::Photo => ".jpg",
            MediaKind::Audio => ".mp3",
            MediaKind::Video | MediaKind::Animation => ".mp4",
            MediaKind::Voice => ".ogg",
            MediaKind::Document => "",
        }
    }
}

/// A downloadable file attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub file_id: String,
    pub file_unique_id: String,
    /// File name attribute, when the sender's client provided one
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl MediaItem {
    pub fn new(kind: MediaKind, file_id: impl Into<String>, file_unique_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
            file_unique_id: file_unique_id.into(),
            file_name: None,
            mime_type: None,
            size: 0,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Non-empty file name attribute
    pub fn attribute_name(&self) -> Option<&str> {
        self.file_name.as_deref().map(str::trim).filter(|name| !name.is_empty())
    }

    /// Native extension including the leading dot, or an empty string.
    ///
    /// Taken from the file name attribute, then the MIME type, then the media kind.
    pub fn native_extension(&self) -> String {
        if let Some(ext) = self
            .attribute_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            return format!(".{}", ext.to_ascii_lowercase());
        }

        if let Some(ext) = self.mime_type.as_deref().and_then(extension_for_mime) {
            return ext.to_string();
        }

        self.kind.default_extension().to_string()
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/flac" | "audio/x-flac" => ".flac",
        "audio/ogg" => ".ogg",
        "audio/mp4" | "audio/x-m4a" => ".m4a",
        "video/mp4" => ".mp4",
        "video/x-matroska" => ".mkv",
        "application/pdf" => ".pdf",
        "application/x-cbr" | "application/vnd.comicbook-rar" => ".cbr",
        "application/x-bittorrent" => ".torrent",
        "application/zip" => ".zip",
        _ => return None,
    };
    Some(ext)
}

/// Whether a message came from a one-to-one chat with the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

/// Platform-independent view of an incoming message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub chat_kind: ChatKind,
    pub sender_id: Option<i64>,
    pub date: DateTime<Utc>,
    /// Message text, or the caption of a media message
    pub text: Option<String>,
    pub media: Option<MediaItem>,
}

impl InboundMessage {
    /// Plain private text message
    pub fn text(chat_id: i64, message_id: i32, sender_id: i64, date: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            chat_kind: ChatKind::Private,
            sender_id: Some(sender_id),
            date,
            text: Some(text.into()),
            media: None,
        }
    }

    /// Private media message without caption
    pub fn media(chat_id: i64, message_id: i32, sender_id: i64, date: DateTime<Utc>, media: MediaItem) -> Self {
        Self {
            chat_id,
            message_id,
            chat_kind: ChatKind::Private,
            sender_id: Some(sender_id),
            date,
            text: None,
            media: Some(media),
        }
    }

    pub fn reference(&self) -> MessageRef {
        MessageRef::new(self.chat_id, self.message_id)
    }

    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }

    /// Trimmed, non-empty text or caption
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}

/// Errors raised by a [`MediaClient`]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("file transfer failed: {0}")]
    Transfer(#[from] teloxide::DownloadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Short error class shown to users and used as a metrics label
    pub fn class_name(&self) -> &'static str {
        match self {
            ClientError::Request(_) => "RequestError",
            ClientError::Transfer(_) => "TransferError",
            ClientError::Io(_) => "IoError",
            ClientError::Other(_) => "ClientError",
        }
    }
}

/// Operations the core needs from the messaging platform.
///
/// Every call is a suspension point and may be cancelled by dropping the
/// returned future; `download_media` in particular must stop writing once
/// its future is dropped.
#[async_trait]
pub trait MediaClient: Send + Sync {
    /// Sends a new message to a chat
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef, ClientError>;

    /// Replies to an existing message
    async fn reply(&self, to: MessageRef, text: &str) -> Result<MessageRef, ClientError>;

    /// Replaces the text of a message sent by the bot
    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), ClientError>;

    /// Downloads `item` to `destination` and returns the path of the complete file
    async fn download_media(&self, item: &MediaItem, destination: &Path) -> Result<PathBuf, ClientError>;

    /// Uploads a local file as a document
    async fn send_file(&self, chat_id: i64, path: &Path, caption: Option<&str>) -> Result<MessageRef, ClientError>;
}
