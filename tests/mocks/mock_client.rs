//! Recording [`MediaClient`] with scripted download behavior

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tgdrop::telegram::{ClientError, MediaClient, MediaItem, MessageRef};

/// Everything the client was asked to do, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Sent { chat_id: i64, text: String },
    Replied { to: MessageRef, text: String },
    Edited { message: MessageRef, text: String },
    Downloaded { file_id: String },
    FileSent { chat_id: i64, path: PathBuf },
}

/// What `download_media` does for a file id
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Write these bytes to the destination
    Write(Vec<u8>),
    /// Wait, then write
    Delay(Duration, Vec<u8>),
    /// Never resolve
    Hang,
    /// Fail with a client error
    Fail(String),
    /// Panic inside the transfer
    Panic,
}

pub struct MockClient {
    events: Mutex<Vec<Event>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    failing_uploads: Mutex<HashSet<String>>,
    hanging_uploads: Mutex<HashSet<String>>,
    next_message_id: AtomicI32,
    download_calls: AtomicUsize,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            behaviors: Mutex::new(HashMap::new()),
            failing_uploads: Mutex::new(HashSet::new()),
            hanging_uploads: Mutex::new(HashSet::new()),
            next_message_id: AtomicI32::new(1000),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, file_id: &str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(file_id.to_string(), behavior);
    }

    /// Uploads of files with this name fail
    pub fn fail_upload(&self, file_name: &str) {
        self.failing_uploads.lock().unwrap().insert(file_name.to_string());
    }

    /// Uploads of files with this name never complete
    pub fn hang_upload(&self, file_name: &str) {
        self.hanging_uploads.lock().unwrap().insert(file_name.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Texts the message was edited to, in order
    pub fn edits_of(&self, message: MessageRef) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Edited { message: m, text } if m == message => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Texts replied to the message, in order
    pub fn replies_to(&self, message: MessageRef) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Replied { to, text } if to == message => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn sent_messages(&self) -> Vec<(i64, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Sent { chat_id, text } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn sent_files(&self) -> Vec<PathBuf> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::FileSent { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn next_ref(&self, chat_id: i64) -> MessageRef {
        MessageRef::new(chat_id, self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl MediaClient for MockClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<MessageRef, ClientError> {
        self.record(Event::Sent {
            chat_id,
            text: text.to_string(),
        });
        Ok(self.next_ref(chat_id))
    }

    async fn reply(&self, to: MessageRef, text: &str) -> Result<MessageRef, ClientError> {
        self.record(Event::Replied {
            to,
            text: text.to_string(),
        });
        Ok(self.next_ref(to.chat_id))
    }

    async fn edit(&self, message: MessageRef, text: &str) -> Result<(), ClientError> {
        self.record(Event::Edited {
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn download_media(&self, item: &MediaItem, destination: &Path) -> Result<PathBuf, ClientError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.record(Event::Downloaded {
            file_id: item.file_id.clone(),
        });

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&item.file_id)
            .cloned()
            .unwrap_or_else(|| Behavior::Write(item.file_id.as_bytes().to_vec()));

        match behavior {
            Behavior::Write(bytes) => {
                tokio::fs::write(destination, bytes).await?;
            }
            Behavior::Delay(delay, bytes) => {
                tokio::time::sleep(delay).await;
                tokio::fs::write(destination, bytes).await?;
            }
            Behavior::Hang => {
                // Leave a partial file behind like an interrupted transfer
                let mut part = destination.as_os_str().to_owned();
                part.push(".part");
                tokio::fs::write(PathBuf::from(part), b"partial").await?;
                std::future::pending::<()>().await;
            }
            Behavior::Fail(message) => return Err(ClientError::Other(message)),
            Behavior::Panic => panic!("transfer of {} blew up", item.file_id),
        }

        Ok(destination.to_path_buf())
    }

    async fn send_file(&self, chat_id: i64, path: &Path, _caption: Option<&str>) -> Result<MessageRef, ClientError> {
        self.record(Event::FileSent {
            chat_id,
            path: path.to_path_buf(),
        });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.failing_uploads.lock().unwrap().contains(&name) {
            return Err(ClientError::Other(format!("upload of {} rejected", name)));
        }
        let hangs = self.hanging_uploads.lock().unwrap().contains(&name);
        if hangs {
            std::future::pending::<()>().await;
        }

        Ok(self.next_ref(chat_id))
    }
}
