//! Task dispatcher: classifies incoming messages
//!
//! Private messages from allow-listed users are either queued for download
//! (media), served synchronously (commands and directives) or echoed back.
//! Group messages only feed the auto scanner.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::config::Settings;
use crate::core::error::{AppError, AppResult};
use crate::download::outbox;
use crate::download::queue::TaskQueue;
use crate::download::router::Layout;
use crate::download::task::{DownloadTask, ProgressHandle};
use crate::telegram::auto_scan::{self, AutoScanner};
use crate::telegram::client::{InboundMessage, MediaClient};
use crate::telegram::commands::{self, Command};

pub const QUEUED_TEXT: &str = "Queued...";

/// Folder directive state shared by all private chats.
///
/// Media snapshots it at enqueue time. A media message whose date differs
/// from `since` starts a new batch and clears the override first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FolderOverride {
    #[default]
    Unset,
    Set {
        dir: PathBuf,
        since: DateTime<Utc>,
    },
}

impl FolderOverride {
    /// Override for a media message dated `batch_date`, clearing a stale one
    pub fn snapshot(&mut self, batch_date: DateTime<Utc>) -> Option<PathBuf> {
        match self {
            FolderOverride::Set { dir, since } if *since == batch_date => Some(dir.clone()),
            FolderOverride::Set { dir, .. } => {
                log::info!("New batch, clearing folder override {}", dir.display());
                *self = FolderOverride::Unset;
                None
            }
            FolderOverride::Unset => None,
        }
    }
}

/// What the dispatcher did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Sender not on the allow-list; nothing sent
    Rejected,
    Enqueued {
        task_id: String,
        folder_override: Option<PathBuf>,
    },
    Command(Command),
    FolderSet(PathBuf),
    OutboxSent(usize),
    /// A synchronous request failed and the error text was replied
    Failed,
    Echoed,
    /// Nothing to do (empty private message, unmonitored group message)
    Ignored,
}

pub struct TaskDispatcher {
    client: Arc<dyn MediaClient>,
    queue: Arc<TaskQueue>,
    settings: Arc<Settings>,
    layout: Layout,
    auto_scan: Arc<AutoScanner>,
    folder: Mutex<FolderOverride>,
}

impl TaskDispatcher {
    pub fn new(
        client: Arc<dyn MediaClient>,
        queue: Arc<TaskQueue>,
        settings: Arc<Settings>,
        auto_scan: Arc<AutoScanner>,
    ) -> Self {
        let layout = settings.layout();
        Self {
            client,
            queue,
            settings,
            layout,
            auto_scan,
            folder: Mutex::new(FolderOverride::Unset),
        }
    }

    /// Current folder directive state
    pub async fn folder_override(&self) -> FolderOverride {
        self.folder.lock().await.clone()
    }

    /// Enqueues a download for a media message
    pub fn enqueue_download(&self, task: DownloadTask) {
        self.queue.push(task);
    }

    /// Handles one incoming message.
    ///
    /// Errors are only returned when even the feedback could not be sent.
    pub async fn dispatch(&self, message: InboundMessage) -> AppResult<Dispatch> {
        if !message.is_private() {
            return self.scan_group(message).await;
        }

        let Some(sender) = message.sender_id.filter(|id| self.settings.is_authorized(*id)) else {
            log::info!(
                "Ignoring message {} from unauthorized user {:?} in chat {}",
                message.message_id,
                message.sender_id,
                message.chat_id
            );
            return Ok(Dispatch::Rejected);
        };

        if message.media.is_some() {
            return self.queue_media(message, sender).await;
        }

        let Some(text) = message.text_content().map(str::to_string) else {
            return Ok(Dispatch::Ignored);
        };

        match self.serve_text(&message, &text).await {
            Ok(dispatch) => Ok(dispatch),
            Err(e) => {
                log::error!("Request {:?} from {} failed: {}", text, sender, e);
                self.client
                    .reply(message.reference(), &format!("ERROR: {}", e))
                    .await?;
                Ok(Dispatch::Failed)
            }
        }
    }

    async fn queue_media(&self, message: InboundMessage, sender: i64) -> AppResult<Dispatch> {
        let status = self.client.reply(message.reference(), QUEUED_TEXT).await?;
        let progress = ProgressHandle::new(status, message.reference());

        let folder_override = self.folder.lock().await.snapshot(message.date);

        let task = DownloadTask::from_message(message, sender, progress, folder_override.clone())
            .ok_or_else(|| AppError::Validation("message has no media".to_string()))?;
        let task_id = task.id.clone();

        self.enqueue_download(task);

        Ok(Dispatch::Enqueued {
            task_id,
            folder_override,
        })
    }

    async fn serve_text(&self, message: &InboundMessage, text: &str) -> AppResult<Dispatch> {
        if let Some(name) = folder_directive(text) {
            return self.set_folder(name, message.date).await;
        }

        if is_sendfiles(text) {
            return self.send_outbox(message).await;
        }

        match Command::parse(text) {
            Ok(Some(command)) => self.run_command(message, command).await,
            Ok(None) => {
                self.client
                    .reply(message.reference(), &format!("Keep-alive: {}", text))
                    .await?;
                Ok(Dispatch::Echoed)
            }
            Err(e) => Err(AppError::Validation(e.to_string())),
        }
    }

    async fn set_folder(&self, name: &str, since: DateTime<Utc>) -> AppResult<Dispatch> {
        if name.is_empty() {
            return Err(AppError::Validation("Usage: /folder NAME or #NAME".to_string()));
        }

        let dir = self.layout.folder(name);
        log::info!("Folder override set to {} (batch {})", dir.display(), since);
        *self.folder.lock().await = FolderOverride::Set {
            dir: dir.clone(),
            since,
        };
        Ok(Dispatch::FolderSet(dir))
    }

    async fn send_outbox(&self, message: &InboundMessage) -> AppResult<Dispatch> {
        let report = outbox::send_pending(
            &*self.client,
            message.chat_id,
            &self.layout.outbox(),
            self.settings.download_timeout,
        )
        .await?;

        let text = if report.sent.is_empty() {
            "Nothing to send".to_string()
        } else {
            format!("Sent {} files", report.sent.len())
        };
        self.client.reply(message.reference(), &text).await?;

        Ok(Dispatch::OutboxSent(report.sent.len()))
    }

    async fn run_command(&self, message: &InboundMessage, command: Command) -> AppResult<Dispatch> {
        let text = match &command {
            Command::Help => commands::HELP_TEXT.to_string(),
            Command::Start => commands::LICENSE_TEXT.to_string(),
            Command::Version => commands::version_text(),
            Command::Id => format!(
                "Chat id: {}\nUser id: {}",
                message.chat_id,
                message.sender_id.unwrap_or_default()
            ),
            Command::AutoStatus => self.auto_scan.status_text().await,
            Command::AutoAdd(group) => self.auto_scan.add_group_text(*group).await,
            Command::AutoRemove(group) => self.auto_scan.remove_group_text(*group).await,
        };

        self.client.reply(message.reference(), &text).await?;
        Ok(Dispatch::Command(command))
    }

    async fn scan_group(&self, message: InboundMessage) -> AppResult<Dispatch> {
        if !self.auto_scan.is_group_monitored(message.chat_id).await {
            return Ok(Dispatch::Ignored);
        }
        let Some(file) = self.auto_scan.large_file(&message) else {
            return Ok(Dispatch::Ignored);
        };
        let Some(owner) = self.settings.owner() else {
            return Ok(Dispatch::Ignored);
        };

        log::info!(
            "Auto scan: {} ({} bytes) in group {}",
            file.file_name,
            file.size,
            message.chat_id
        );

        let text = if self.auto_scan.notify_user() {
            auto_scan::notification_text(message.chat_id, &file)
        } else {
            QUEUED_TEXT.to_string()
        };
        let status = self.client.send_message(owner, &text).await?;
        let progress = ProgressHandle::new(status, status);

        let task = DownloadTask::from_message(message, owner, progress, None)
            .ok_or_else(|| AppError::Validation("message has no media".to_string()))?;
        let task_id = task.id.clone();
        self.enqueue_download(task);

        Ok(Dispatch::Enqueued {
            task_id,
            folder_override: None,
        })
    }
}

/// Folder name of a `/folder NAME` or `#NAME` directive.
///
/// `Some("")` for a bare `/folder`, so the caller can answer with usage.
pub fn folder_directive(text: &str) -> Option<&str> {
    let text = text.trim();

    if let Some(head) = text.get(..7) {
        if head.eq_ignore_ascii_case("/folder") {
            let rest = &text[7..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return Some(rest.trim());
            }
            return None;
        }
    }

    text.strip_prefix('#').map(str::trim).filter(|name| !name.is_empty())
}

/// True for the bulk re-send directive (any letter case)
pub fn is_sendfiles(text: &str) -> bool {
    let head = text.split_whitespace().next().unwrap_or_default();
    head.split('@').next().unwrap_or_default().eq_ignore_ascii_case("/sendfiles")
}
