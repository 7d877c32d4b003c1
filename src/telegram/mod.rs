//! Telegram integration: client, dispatcher, commands and auto scan

pub mod auto_scan;
pub mod bot;
pub mod client;
pub mod commands;
pub mod dispatcher;
pub mod handlers;

// Re-exports for convenience
pub use auto_scan::AutoScanner;
pub use bot::{create_bot, setup_bot_commands, TelegramClient};
pub use client::{ClientError, InboundMessage, MediaClient, MediaItem, MediaKind, MessageRef};
pub use dispatcher::{Dispatch, FolderOverride, TaskDispatcher};
pub use handlers::{schema, HandlerDeps, HandlerError};
