use thiserror::Error;

use crate::core::config::ConfigError;
use crate::download::error::OutboxError;
use crate::telegram::client::ClientError;

/// Centralized error types for the application
///
/// Per-task download failures stay inside the worker that owns the task;
/// everything that can surface from the dispatcher or from startup is
/// converted to this enum.
///
/// # Example
///
/// ```no_run
/// use tgdrop::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Errors from the messaging client abstraction
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Bulk re-send errors
    #[error("Outbox error: {0}")]
    Outbox(#[from] OutboxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Validation(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Validation(err.to_string())
    }
}
