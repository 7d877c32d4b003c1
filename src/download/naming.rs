//! File name resolution for downloaded media

use chrono::{DateTime, Utc};

use crate::core::utils::{escape_filename, sanitize_caption};
use crate::telegram::client::MediaItem;

/// Picks the name a downloaded file is stored under.
///
/// In order of preference:
/// 1. the file name attribute of the media (escaped)
/// 2. the sanitized caption plus the native extension
/// 3. `YYYYmmdd_HHMMSS_<unique id>` plus the native extension
pub fn resolve_file_name(media: &MediaItem, caption: Option<&str>, date: DateTime<Utc>) -> String {
    if let Some(name) = media.attribute_name() {
        return escape_filename(name);
    }

    let extension = media.native_extension();

    if let Some(stem) = caption.map(sanitize_caption).filter(|stem| !stem.is_empty()) {
        return format!("{}{}", stem, extension);
    }

    format!(
        "{}_{}{}",
        date.format("%Y%m%d_%H%M%S"),
        escape_filename(&media.file_unique_id),
        extension
    )
}
