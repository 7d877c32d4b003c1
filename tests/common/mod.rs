//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::time::Duration;

use tgdrop::core::Settings;
use tgdrop::download::{DownloadTask, ProgressHandle};
use tgdrop::telegram::{InboundMessage, MediaItem, MediaKind, MessageRef};

/// Allow-listed user; also the owner
pub const OWNER: i64 = 100;

/// Not on the allow-list
pub const STRANGER: i64 = 999;

/// Settings rooted in a temporary directory: `<tmp>/download` and `<tmp>/watch`
pub fn settings(temp: &Path) -> Settings {
    let mut settings = Settings::new(vec![OWNER], temp.join("download"), temp.join("watch"));
    settings.download_timeout = Duration::from_secs(5);
    settings.max_parallel = 2;
    settings
}

pub fn date(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, second).unwrap()
}

pub fn document(file_id: &str, file_name: &str) -> MediaItem {
    MediaItem::new(MediaKind::Document, file_id, format!("uid-{}", file_id)).with_file_name(file_name)
}

pub fn photo(file_id: &str) -> MediaItem {
    MediaItem::new(MediaKind::Photo, file_id, format!("uid-{}", file_id))
}

pub fn media_message(message_id: i32, sender: i64, date: DateTime<Utc>, media: MediaItem) -> InboundMessage {
    InboundMessage::media(sender, message_id, sender, date, media)
}

pub fn text_message(message_id: i32, sender: i64, date: DateTime<Utc>, text: &str) -> InboundMessage {
    InboundMessage::text(sender, message_id, sender, date, text)
}

/// Task as the dispatcher would build it; status message id is `message_id + 1`
pub fn task_for(media: MediaItem, requested_by: i64, folder_override: Option<&Path>) -> DownloadTask {
    task_with_message(media_message(1, requested_by, date(0), media), requested_by, folder_override)
}

pub fn task_with_message(message: InboundMessage, requested_by: i64, folder_override: Option<&Path>) -> DownloadTask {
    let origin = message.reference();
    let status = MessageRef::new(origin.chat_id, origin.message_id + 1);
    DownloadTask::from_message(
        message,
        requested_by,
        ProgressHandle::new(status, origin),
        folder_override.map(Path::to_path_buf),
    )
    .unwrap()
}
