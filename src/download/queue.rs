use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex, Notify};

use crate::core::metrics;
use crate::download::task::DownloadTask;

/// FIFO queue of download tasks shared by the dispatcher and the workers.
///
/// Any number of producers push; any number of workers pop. A popped task
/// comes with a [`TaskDone`] guard, and the outstanding count only drops
/// when that guard is dropped, so [`TaskQueue::join`] returns once every
/// pushed task has been fully processed.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tgdrop::TaskQueue;
///
/// # async fn example() {
/// let queue = Arc::new(TaskQueue::new());
/// if let Some((task, done)) = queue.pop().await {
///     println!("processing {}", task.id);
///     drop(done);
/// }
/// queue.join().await;
/// # }
/// ```
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<DownloadTask>,
    receiver: Mutex<mpsc::UnboundedReceiver<DownloadTask>>,
    /// Pushed but not yet popped
    pending: AtomicUsize,
    /// Pushed but not yet marked done
    outstanding: AtomicUsize,
    drained: Notify,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Adds a task at the back of the queue
    pub fn push(&self, task: DownloadTask) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        self.pending.fetch_add(1, Ordering::AcqRel);

        let task_id = task.id.clone();
        if self.sender.send(task).is_err() {
            // Receiver lives as long as the queue, so this only happens while it is torn down
            log::error!("Download queue is closed, dropping task {}", task_id);
            self.pending.fetch_sub(1, Ordering::AcqRel);
            self.finish_one();
            return;
        }

        metrics::TASKS_ENQUEUED_TOTAL.inc();
        metrics::QUEUE_DEPTH.set(self.len() as i64);
        log::info!("Task {} queued ({} waiting)", task_id, self.len());
    }

    /// Waits for the next task.
    ///
    /// Workers call this concurrently; tasks are handed out one at a time in
    /// push order. Cancel-safe: dropping the future never loses a task.
    pub async fn pop(&self) -> Option<(DownloadTask, TaskDone<'_>)> {
        let task = {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await?
        };

        self.pending.fetch_sub(1, Ordering::AcqRel);
        metrics::QUEUE_DEPTH.set(self.len() as i64);

        Some((task, TaskDone { queue: self }))
    }

    /// Tasks waiting for a worker
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tasks pushed and not yet marked done, including the ones being processed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Waits until every pushed task has been marked done
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Marks a popped task as done when dropped.
///
/// Dropping happens on every exit path of a worker iteration, including
/// early returns, panics and cancellation at shutdown.
#[must_use = "dropping the guard marks the task as done"]
pub struct TaskDone<'a> {
    queue: &'a TaskQueue,
}

impl Drop for TaskDone<'_> {
    fn drop(&mut self) {
        self.queue.finish_one();
    }
}
