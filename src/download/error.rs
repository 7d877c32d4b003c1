use std::path::PathBuf;
use thiserror::Error;

use crate::telegram::client::ClientError;

/// Why a single download task did not produce a file.
///
/// Errors stay inside the worker that owns the task; they decide which
/// feedback the user gets and which counter is bumped.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Originating user is not on the allow-list
    #[error("user {0} is not authorized")]
    UnauthorizedUser(i64),

    /// Transfer exceeded the per-download deadline and was cancelled
    #[error("download timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Anything else that went wrong while downloading or placing the file
    #[error(transparent)]
    Transfer(#[from] TransferFailure),
}

/// Failures after the transfer was started
#[derive(Error, Debug)]
pub enum TransferFailure {
    #[error("{0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Destination directory could not be created, or the file could not be moved into it
    #[error("cannot place file in {}: {source}", path.display())]
    Routing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Short class name used in the detailed failure reply and as metrics label
    pub fn class_name(&self) -> &'static str {
        match self {
            DownloadError::UnauthorizedUser(_) => "UnauthorizedUser",
            DownloadError::Timeout { .. } => "DownloadTimeout",
            DownloadError::Transfer(TransferFailure::Client(err)) => err.class_name(),
            DownloadError::Transfer(TransferFailure::Io(_)) => "IoError",
            DownloadError::Transfer(TransferFailure::Routing { .. }) => "RoutingFailure",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DownloadError::Timeout { .. })
    }
}

impl From<ClientError> for DownloadError {
    fn from(err: ClientError) -> Self {
        DownloadError::Transfer(TransferFailure::Client(err))
    }
}

/// Errors of the bulk re-send directive
#[derive(Error, Debug)]
pub enum OutboxError {
    #[error("cannot read outbox: {0}")]
    Io(#[from] std::io::Error),

    #[error("sending {} failed: {source}", path.display())]
    Send {
        path: PathBuf,
        #[source]
        source: ClientError,
    },

    #[error("sending {} timed out after {secs}s", path.display())]
    Timeout { path: PathBuf, secs: u64 },

    #[error("cannot mark {} as sent: {source}", path.display())]
    Mark {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_class_names() {
        assert_eq!(DownloadError::Timeout { secs: 1 }.class_name(), "DownloadTimeout");
        assert_eq!(DownloadError::UnauthorizedUser(5).class_name(), "UnauthorizedUser");

        let io_err: DownloadError = TransferFailure::Io(io::Error::other("disk")).into();
        assert_eq!(io_err.class_name(), "IoError");

        let client: DownloadError = ClientError::Other("boom".into()).into();
        assert_eq!(client.class_name(), "ClientError");
    }

    #[test]
    fn test_routing_failure_keeps_cause() {
        let err: DownloadError = TransferFailure::Routing {
            path: PathBuf::from("/download/pdf"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();

        assert_eq!(err.class_name(), "RoutingFailure");
        assert_eq!(err.to_string(), "cannot place file in /download/pdf: denied");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_timeout_display() {
        let err = DownloadError::Timeout { secs: 3600 };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "download timed out after 3600s");
    }
}
