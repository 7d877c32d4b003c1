//! Real-time monitoring of groups for large files
//!
//! Group messages never take the interactive path. When auto scan is on and
//! the group is monitored, files at or above the size threshold are queued
//! for download on behalf of the owner. Photos are never picked up.

use std::collections::BTreeSet;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::config::AutoScanSettings;
use crate::core::utils::format_size;
use crate::telegram::client::{InboundMessage, MediaKind};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutoScanError {
    #[error("Auto scan is disabled. Set AUTO_SCAN_ENABLED=true to use it.")]
    Disabled,
}

/// Large file found in a monitored group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeFile {
    pub file_name: String,
    pub size: u64,
}

/// Auto scan state; the group list can change at runtime and is not persisted
pub struct AutoScanner {
    enabled: bool,
    min_size_bytes: u64,
    notify_user: bool,
    whitelist_only: bool,
    groups: RwLock<BTreeSet<i64>>,
}

impl AutoScanner {
    pub fn new(settings: &AutoScanSettings) -> Self {
        Self {
            enabled: settings.enabled,
            min_size_bytes: settings.min_size_mb.saturating_mul(BYTES_PER_MB),
            notify_user: settings.notify_user,
            whitelist_only: settings.whitelist_only,
            groups: RwLock::new(settings.groups.iter().copied().collect()),
        }
    }

    pub fn notify_user(&self) -> bool {
        self.notify_user
    }

    /// Whitelist mode watches only listed groups; blacklist mode watches all others
    pub async fn is_group_monitored(&self, group_id: i64) -> bool {
        if !self.enabled {
            return false;
        }
        let listed = self.groups.read().await.contains(&group_id);
        if self.whitelist_only {
            listed
        } else {
            !listed
        }
    }

    /// Non-photo media at or above the size threshold, if the message carries one
    pub fn large_file(&self, message: &InboundMessage) -> Option<LargeFile> {
        let media = message.media.as_ref()?;
        if media.kind == MediaKind::Photo || media.size < self.min_size_bytes {
            return None;
        }
        Some(LargeFile {
            file_name: media.attribute_name().unwrap_or("unknown_file").to_string(),
            size: media.size,
        })
    }

    /// Adds a group to the list. `Ok(false)` if it was already there.
    pub async fn add_group(&self, group_id: i64) -> Result<bool, AutoScanError> {
        if !self.enabled {
            return Err(AutoScanError::Disabled);
        }
        let added = self.groups.write().await.insert(group_id);
        if added {
            log::info!("Auto scan: group {} added", group_id);
        }
        Ok(added)
    }

    /// Removes a group from the list. `Ok(false)` if it was not there.
    pub async fn remove_group(&self, group_id: i64) -> Result<bool, AutoScanError> {
        if !self.enabled {
            return Err(AutoScanError::Disabled);
        }
        let removed = self.groups.write().await.remove(&group_id);
        if removed {
            log::info!("Auto scan: group {} removed", group_id);
        }
        Ok(removed)
    }

    pub async fn status_text(&self) -> String {
        if !self.enabled {
            return "Auto scan: disabled".to_string();
        }
        let groups = self.groups.read().await;
        let listed = if groups.is_empty() {
            "none".to_string()
        } else {
            groups.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        };
        format!(
            "Auto scan: enabled\nMode: {}\nGroups: {}\nMinimum size: {}\nNotify: {}",
            if self.whitelist_only { "whitelist" } else { "blacklist" },
            listed,
            format_size(self.min_size_bytes),
            if self.notify_user { "yes" } else { "no" }
        )
    }

    pub async fn add_group_text(&self, group_id: i64) -> String {
        match self.add_group(group_id).await {
            Ok(true) => format!("Group {} is now monitored", group_id),
            Ok(false) => format!("Group {} is already in the list", group_id),
            Err(e) => e.to_string(),
        }
    }

    pub async fn remove_group_text(&self, group_id: i64) -> String {
        match self.remove_group(group_id).await {
            Ok(true) => format!("Group {} removed from the list", group_id),
            Ok(false) => format!("Group {} was not in the list", group_id),
            Err(e) => e.to_string(),
        }
    }
}

/// Notification sent to the owner when a large file is picked up
pub fn notification_text(group_id: i64, file: &LargeFile) -> String {
    format!(
        "Large file detected in group {}\n{} ({})\nQueued...",
        group_id,
        file.file_name,
        format_size(file.size)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::client::{ChatKind, MediaItem};
    use chrono::Utc;

    fn settings(enabled: bool, whitelist_only: bool) -> AutoScanSettings {
        AutoScanSettings {
            enabled,
            groups: vec![-100],
            min_size_mb: 1,
            notify_user: true,
            whitelist_only,
        }
    }

    fn group_message(media: MediaItem) -> InboundMessage {
        let mut msg = InboundMessage::media(-100, 5, 9, Utc::now(), media);
        msg.chat_kind = ChatKind::Group;
        msg
    }

    #[tokio::test]
    async fn test_whitelist_mode() {
        let scanner = AutoScanner::new(&settings(true, true));
        assert!(scanner.is_group_monitored(-100).await);
        assert!(!scanner.is_group_monitored(-200).await);
    }

    #[tokio::test]
    async fn test_blacklist_mode() {
        let scanner = AutoScanner::new(&settings(true, false));
        assert!(!scanner.is_group_monitored(-100).await);
        assert!(scanner.is_group_monitored(-200).await);
    }

    #[tokio::test]
    async fn test_disabled_monitors_nothing() {
        let scanner = AutoScanner::new(&settings(false, true));
        assert!(!scanner.is_group_monitored(-100).await);
        assert_eq!(scanner.add_group(-5).await, Err(AutoScanError::Disabled));
        assert_eq!(scanner.status_text().await, "Auto scan: disabled");
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let scanner = AutoScanner::new(&settings(true, true));
        assert_eq!(scanner.add_group(-200).await, Ok(true));
        assert_eq!(scanner.add_group(-200).await, Ok(false));
        assert!(scanner.is_group_monitored(-200).await);
        assert_eq!(scanner.remove_group(-200).await, Ok(true));
        assert_eq!(scanner.remove_group(-200).await, Ok(false));
        assert!(scanner.status_text().await.contains("Groups: -100"));
    }

    #[test]
    fn test_large_file_threshold() {
        let scanner = AutoScanner::new(&settings(true, true));

        let small = MediaItem::new(MediaKind::Document, "a", "a").with_size(1000);
        assert_eq!(scanner.large_file(&group_message(small)), None);

        let big = MediaItem::new(MediaKind::Document, "b", "b").with_size(2 * BYTES_PER_MB);
        assert_eq!(
            scanner.large_file(&group_message(big)),
            Some(LargeFile {
                file_name: "unknown_file".to_string(),
                size: 2 * BYTES_PER_MB
            })
        );

        let photo = MediaItem::new(MediaKind::Photo, "c", "c").with_size(5 * BYTES_PER_MB);
        assert_eq!(scanner.large_file(&group_message(photo)), None);
    }

    #[test]
    fn test_large_video_and_audio_are_picked_up() {
        let scanner = AutoScanner::new(&settings(true, true));

        let video = MediaItem::new(MediaKind::Video, "v", "v")
            .with_file_name("season.mkv")
            .with_size(500 * BYTES_PER_MB);
        assert_eq!(
            scanner.large_file(&group_message(video)),
            Some(LargeFile {
                file_name: "season.mkv".to_string(),
                size: 500 * BYTES_PER_MB
            })
        );

        let audio = MediaItem::new(MediaKind::Audio, "a", "a").with_size(3 * BYTES_PER_MB);
        assert_eq!(
            scanner.large_file(&group_message(audio)),
            Some(LargeFile {
                file_name: "unknown_file".to_string(),
                size: 3 * BYTES_PER_MB
            })
        );

        let small_video = MediaItem::new(MediaKind::Video, "s", "s").with_size(1000);
        assert_eq!(scanner.large_file(&group_message(small_video)), None);
    }
}
