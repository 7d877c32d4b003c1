//! Download worker pool
//!
//! A fixed number of workers share one [`TaskQueue`]. Each iteration takes a
//! task, checks authorization, downloads under a deadline, routes the file
//! and reports progress through the task's handle. Tasks are attempted once.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::core::utils::short_time;
use crate::download::error::{DownloadError, TransferFailure};
use crate::download::naming::resolve_file_name;
use crate::download::queue::TaskQueue;
use crate::download::router::PathRouter;
use crate::download::task::DownloadTask;
use crate::telegram::client::{MediaClient, MessageRef};

pub const STATUS_DOWNLOADING: &str = "Downloading...";
pub const STATUS_ERROR: &str = "Error!";

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// File stored at the given path
    Completed(PathBuf),
    /// Requester not on the allow-list; nothing was downloaded
    Discarded,
    TimedOut,
    /// Any other failure, with its error class
    Failed(&'static str),
}

impl TaskOutcome {
    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Completed(_) => "completed",
            TaskOutcome::Discarded => "unauthorized",
            TaskOutcome::TimedOut => "timeout",
            TaskOutcome::Failed(_) => "failed",
        }
    }
}

/// Executes single tasks; shared by every worker of a pool
pub struct TaskRunner {
    client: Arc<dyn MediaClient>,
    router: PathRouter,
    settings: Arc<Settings>,
}

impl TaskRunner {
    pub fn new(client: Arc<dyn MediaClient>, settings: Arc<Settings>) -> Self {
        let router = PathRouter::new(settings.layout());
        Self {
            client,
            router,
            settings,
        }
    }

    /// Runs one task to completion and sends its feedback.
    ///
    /// Never fails: every error is turned into a status edit plus a reply.
    pub async fn process(&self, worker: &str, task: DownloadTask) -> TaskOutcome {
        if !self.settings.is_authorized(task.requested_by) {
            let err = DownloadError::UnauthorizedUser(task.requested_by);
            log::info!("[{}] Discarding task {}: {}", worker, task.id, err);
            metrics::record_outcome(TaskOutcome::Discarded.label());
            return TaskOutcome::Discarded;
        }

        let file_name = resolve_file_name(&task.media, task.caption(), task.source.date);
        log::info!(
            "[{}] Task {} -> {} (queued for {}s)",
            worker,
            task.id,
            file_name,
            (Utc::now() - task.enqueued_at).num_seconds()
        );

        self.notify_edit(&task, STATUS_DOWNLOADING).await;

        metrics::ACTIVE_DOWNLOADS.inc();
        let started = Instant::now();
        let result = self.execute(&task, &file_name).await;
        metrics::ACTIVE_DOWNLOADS.dec();

        let outcome = match result {
            Ok(path) => {
                metrics::DOWNLOAD_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
                log::info!("[{}] Stored {} at {}", worker, file_name, path.display());
                self.notify_edit(&task, &format!("Download {} finished {}", file_name, short_time()))
                    .await;
                TaskOutcome::Completed(path)
            }
            Err(err) if err.is_timeout() => {
                log::warn!("[{}] Task {} ({}): {}", worker, task.id, file_name, err);
                self.notify_failure(
                    &task,
                    &format!(
                        "ERROR: Timeout exceeded downloading {} ({}s). The transfer was cancelled.",
                        file_name,
                        self.settings.download_timeout.as_secs()
                    ),
                )
                .await;
                TaskOutcome::TimedOut
            }
            Err(err) => {
                log::error!(
                    "[{}] Task {} ({}) failed with {}: {}",
                    worker,
                    task.id,
                    file_name,
                    err.class_name(),
                    err
                );
                metrics::record_failure(err.class_name());
                self.notify_failure(
                    &task,
                    &format!("ERROR: {} downloading {}: {}", err.class_name(), file_name, err),
                )
                .await;
                TaskOutcome::Failed(err.class_name())
            }
        };

        metrics::record_outcome(outcome.label());
        outcome
    }

    async fn execute(&self, task: &DownloadTask, file_name: &str) -> Result<PathBuf, DownloadError> {
        // One directory per task keeps concurrent downloads of equal names apart
        let staging_dir = self.router.layout().tmp().join(&task.id);
        tokio::fs::create_dir_all(&staging_dir)
            .await
            .map_err(TransferFailure::Io)?;

        let result = self.transfer_and_route(task, file_name, &staging_dir).await;
        discard_staging(&staging_dir).await;
        result
    }

    async fn transfer_and_route(
        &self,
        task: &DownloadTask,
        file_name: &str,
        staging_dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let staging = staging_dir.join(file_name);
        let deadline = self.settings.download_timeout;

        let downloaded =
            match tokio::time::timeout(deadline, self.client.download_media(&task.media, &staging)).await {
                Ok(Ok(path)) => path,
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => {
                    return Err(DownloadError::Timeout {
                        secs: deadline.as_secs(),
                    })
                }
            };

        let destination_dir = self.router.destination_for(file_name, task.folder_override.as_deref());
        self.router
            .route(file_name, task.folder_override.as_deref())
            .map_err(|source| TransferFailure::Routing {
                path: destination_dir.clone(),
                source,
            })?;

        let target = destination_dir.join(file_name);
        move_file(&downloaded, &target)
            .await
            .map_err(|source| TransferFailure::Routing {
                path: destination_dir,
                source,
            })?;

        Ok(target)
    }

    async fn notify_edit(&self, task: &DownloadTask, text: &str) {
        self.edit_status(&task.id, task.progress.status, text).await;
    }

    async fn edit_status(&self, task_id: &str, status: MessageRef, text: &str) {
        if let Err(e) = self.client.edit(status, text).await {
            log::warn!("Failed to update status of task {}: {}", task_id, e);
        }
    }

    async fn notify_failure(&self, task: &DownloadTask, detail: &str) {
        self.notify_edit(task, STATUS_ERROR).await;
        if let Err(e) = self.client.reply(task.progress.origin, detail).await {
            log::warn!("Failed to send error reply for task {}: {}", task.id, e);
        }
    }
}

/// Moves a file, falling back to copy + remove across filesystems.
///
/// An existing file at `target` is replaced.
async fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match tokio::fs::rename(source, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(e) => {
            log::debug!("rename {} failed ({}), copying instead", source.display(), e);
            tokio::fs::copy(source, target).await?;
            tokio::fs::remove_file(source).await
        }
    }
}

/// Removes the task's staging directory with whatever a transfer left in it
async fn discard_staging(staging_dir: &Path) {
    match tokio::fs::remove_dir_all(staging_dir).await {
        Ok(()) => log::debug!("Removed staging directory {}", staging_dir.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove staging directory {}: {}", staging_dir.display(), e),
    }
}

/// Fixed set of workers running for the lifetime of the process
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` workers named `worker-0..count-1`
    pub fn spawn(count: usize, queue: Arc<TaskQueue>, runner: Arc<TaskRunner>) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..count.max(1))
            .map(|i| {
                let name = format!("worker-{}", i);
                tokio::spawn(run_worker(
                    name,
                    Arc::clone(&queue),
                    Arc::clone(&runner),
                    cancel.child_token(),
                ))
            })
            .collect::<Vec<_>>();

        log::info!("Started {} download workers", handles.len());
        Self { cancel, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancels every worker. In-flight transfers are abandoned, not drained.
    pub async fn shutdown(self) {
        log::info!("Stopping {} download workers", self.handles.len());
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    log::error!("Download worker panicked: {}", e);
                }
            }
        }
    }
}

async fn run_worker(name: String, queue: Arc<TaskQueue>, runner: Arc<TaskRunner>, cancel: CancellationToken) {
    log::debug!("[{}] started", name);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = queue.pop() => next,
        };

        let Some((task, done)) = next else {
            break;
        };

        // Own task per job so a panic costs the job, not the worker
        let task_id = task.id.clone();
        let progress = task.progress;
        let mut job = {
            let runner = Arc::clone(&runner);
            let name = name.clone();
            tokio::spawn(async move { runner.process(&name, task).await })
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                log::warn!("[{}] cancelled while processing task {}", name, task_id);
                job.abort();
                drop(done);
                break;
            }
            joined = &mut job => {
                if let Err(e) = joined {
                    log::error!("[{}] task {} aborted: {}", name, task_id, e);
                    metrics::record_outcome("failed");
                    runner.edit_status(&task_id, progress.status, STATUS_ERROR).await;
                    discard_staging(&runner.router.layout().tmp().join(&task_id)).await;
                }
            }
        }

        drop(done);
    }

    log::debug!("[{}] stopped", name);
}
