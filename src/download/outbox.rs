//! Bulk re-send of the outbox directory
//!
//! Files dropped into `<download_root>/sendFiles/` are sent back to the chat
//! that asked for them. A sent file is renamed with the `_process` suffix so
//! a later run skips it.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::metrics;
use crate::download::error::OutboxError;
use crate::telegram::client::MediaClient;

/// Suffix appended to a file name once it has been sent
pub const SENT_MARKER: &str = "_process";

/// Result of one bulk re-send run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutboxReport {
    /// Marked paths of the files sent in this run, in send order
    pub sent: Vec<PathBuf>,
    /// Files skipped because they were already marked
    pub skipped: usize,
}

/// True if the file was sent by an earlier run
pub fn is_marked(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(SENT_MARKER))
}

/// Path a file is renamed to after a successful send
pub fn marked_path(path: &Path) -> PathBuf {
    let mut marked = path.as_os_str().to_owned();
    marked.push(SENT_MARKER);
    PathBuf::from(marked)
}

/// Every regular file below `outbox`, sorted by path. A missing outbox is empty.
pub fn list_files(outbox: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![outbox.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound && dir == outbox => return Ok(files),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Sends every unmarked outbox file to `chat_id` and marks it.
///
/// Each upload gets `timeout`. The first failure stops the run; files sent
/// before it stay marked, so the next run resumes where this one stopped.
pub async fn send_pending(
    client: &dyn MediaClient,
    chat_id: i64,
    outbox: &Path,
    timeout: Duration,
) -> Result<OutboxReport, OutboxError> {
    let mut report = OutboxReport::default();

    for path in list_files(outbox)? {
        if is_marked(&path) {
            report.skipped += 1;
            continue;
        }

        let caption = path.file_name().and_then(|name| name.to_str()).map(str::to_string);
        log::info!("Sending outbox file {}", path.display());

        match tokio::time::timeout(timeout, client.send_file(chat_id, &path, caption.as_deref())).await {
            Ok(Ok(_)) => {}
            Ok(Err(source)) => return Err(OutboxError::Send { path, source }),
            Err(_) => {
                return Err(OutboxError::Timeout {
                    path,
                    secs: timeout.as_secs(),
                })
            }
        }

        let marked = marked_path(&path);
        tokio::fs::rename(&path, &marked)
            .await
            .map_err(|source| OutboxError::Mark {
                path: path.clone(),
                source,
            })?;

        metrics::OUTBOX_FILES_SENT_TOTAL.inc();
        report.sent.push(marked);
    }

    log::info!(
        "Outbox run finished: {} sent, {} already sent",
        report.sent.len(),
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_marking() {
        let path = Path::new("/out/report.pdf");
        assert!(!is_marked(path));
        assert_eq!(marked_path(path), PathBuf::from("/out/report.pdf_process"));
        assert!(is_marked(&marked_path(path)));
    }

    #[test]
    fn test_list_files_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        let outbox = temp.path().join("sendFiles");
        std::fs::create_dir_all(outbox.join("sub")).unwrap();
        for name in ["b.txt", "a.txt", "sub/c.txt"] {
            std::fs::write(outbox.join(name), b"x").unwrap();
        }

        let files = list_files(&outbox).unwrap();

        assert_eq!(
            files,
            vec![outbox.join("a.txt"), outbox.join("b.txt"), outbox.join("sub").join("c.txt")]
        );
    }

    #[test]
    fn test_missing_outbox_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(list_files(&temp.path().join("nope")).unwrap().is_empty());
    }
}
