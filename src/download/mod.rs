//! Download management: queue, workers, routing and the outbox

pub mod error;
pub mod naming;
pub mod outbox;
pub mod queue;
pub mod router;
pub mod task;
pub mod worker;

// Re-exports for convenience
pub use error::{DownloadError, OutboxError, TransferFailure};
pub use queue::{TaskDone, TaskQueue};
pub use router::{Layout, PathRouter, RoutingRule};
pub use task::{DownloadTask, ProgressHandle};
pub use worker::{TaskOutcome, TaskRunner, WorkerPool};
