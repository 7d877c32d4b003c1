//! tgdrop - Telegram bot that downloads forwarded media into a categorized tree
//!
//! Media forwarded to the bot is queued, downloaded by a fixed pool of
//! workers and moved into a directory chosen by the path router.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, metrics and small helpers
//! - `download`: task queue, worker pool, path router and the outbox
//! - `telegram`: platform client, update dispatcher, commands and auto scan

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, Settings};
pub use crate::download::{DownloadTask, Layout, PathRouter, TaskQueue, TaskRunner, WorkerPool};
pub use crate::telegram::{MediaClient, TaskDispatcher};
