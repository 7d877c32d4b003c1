use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use crate::telegram::client::{InboundMessage, MediaItem, MessageRef};

/// Where a task reports its progress.
///
/// `status` is the acknowledgement the bot sent and gets edited as the task
/// advances. Detailed failure explanations are sent as replies to `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressHandle {
    pub status: MessageRef,
    pub origin: MessageRef,
}

impl ProgressHandle {
    pub fn new(status: MessageRef, origin: MessageRef) -> Self {
        Self { status, origin }
    }
}

/// Structure representing a download task.
///
/// Created once per media-bearing message and consumed by exactly one worker.
/// The folder override is a snapshot taken at enqueue time; later folder
/// directives do not affect tasks already in the queue.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Unique task identifier (UUID)
    pub id: String,
    /// Message the media came from
    pub source: InboundMessage,
    pub media: MediaItem,
    /// User the task is executed for; checked against the allow-list by the worker
    pub requested_by: i64,
    pub progress: ProgressHandle,
    pub folder_override: Option<PathBuf>,
    pub enqueued_at: DateTime<Utc>,
}

impl DownloadTask {
    /// Builds a task for the media of `source`; `None` if the message carries no media
    pub fn from_message(
        source: InboundMessage,
        requested_by: i64,
        progress: ProgressHandle,
        folder_override: Option<PathBuf>,
    ) -> Option<Self> {
        let media = source.media.clone()?;
        Some(Self {
            id: Uuid::new_v4().to_string(),
            source,
            media,
            requested_by,
            progress,
            folder_override,
            enqueued_at: Utc::now(),
        })
    }

    /// Caption of the source message, if any
    pub fn caption(&self) -> Option<&str> {
        self.source.text_content()
    }
}
