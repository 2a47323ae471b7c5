//! Download error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::DownloadState;

/// Discriminator for [`DownloadError`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadErrorKind {
    Transfer,
    Storage,
    InvalidStateTransition,
    AlreadyQueued,
    NotInQueue,
    Cancelled,
    Other,
}

/// Error type for download operations.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// Network or I/O failure while transferring; retryable.
    #[error("Transfer failed: {message}")]
    Transfer {
        /// Detailed error message.
        message: String,
    },

    /// Failed to delete or create an artifact on disk; never retried automatically.
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message.
        message: String,
    },

    /// A requested state change is not allowed from the current state.
    ///
    /// Only used inside the queue; public operations turn it into a no-op.
    #[error("Invalid transition for {task_id}: {from} -> {to}")]
    InvalidStateTransition {
        /// Task the transition was requested for.
        task_id: String,
        /// State the record was in.
        from: DownloadState,
        /// State that was requested.
        to: DownloadState,
    },

    /// A task with the same id is already queued.
    #[error("Already queued: {id}")]
    AlreadyQueued {
        /// The id that is already present.
        id: String,
    },

    /// Task not found in the queue.
    #[error("Not in queue: {id}")]
    NotInQueue {
        /// The id that wasn't found.
        id: String,
    },

    /// Transfer was cancelled by the user.
    #[error("Download cancelled")]
    Cancelled,

    /// General/uncategorized error.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl DownloadError {
    /// Create a transfer error.
    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer {
            message: message.into(),
        }
    }

    /// Create a transfer error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        Self::Transfer {
            message: format!("{:?}: {err}", err.kind()),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(
        task_id: impl Into<String>,
        from: DownloadState,
        to: DownloadState,
    ) -> Self {
        Self::InvalidStateTransition {
            task_id: task_id.into(),
            from,
            to,
        }
    }

    /// Create an already queued error.
    pub fn already_queued(id: impl Into<String>) -> Self {
        Self::AlreadyQueued { id: id.into() }
    }

    /// Create a not in queue error.
    pub fn not_in_queue(id: impl Into<String>) -> Self {
        Self::NotInQueue { id: id.into() }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// The variant discriminator.
    #[must_use]
    pub const fn kind(&self) -> DownloadErrorKind {
        match self {
            Self::Transfer { .. } => DownloadErrorKind::Transfer,
            Self::Storage { .. } => DownloadErrorKind::Storage,
            Self::InvalidStateTransition { .. } => DownloadErrorKind::InvalidStateTransition,
            Self::AlreadyQueued { .. } => DownloadErrorKind::AlreadyQueued,
            Self::NotInQueue { .. } => DownloadErrorKind::NotInQueue,
            Self::Cancelled => DownloadErrorKind::Cancelled,
            Self::Other { .. } => DownloadErrorKind::Other,
        }
    }

    /// Check if this error may be retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Convert into a transfer failure, keeping the message of other kinds.
    ///
    /// Used when a downloader reports an error of an unexpected kind for a
    /// running transfer.
    #[must_use]
    pub fn into_transfer(self) -> Self {
        match self {
            transfer @ Self::Transfer { .. } => transfer,
            other => Self::transfer(other.to_string()),
        }
    }

    /// Convert to a user-friendly message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transfer { message } => format!("Download failed: {message}"),
            Self::Storage { message } => format!("Could not update downloaded files: {message}"),
            Self::InvalidStateTransition { .. } => {
                "That action is not available right now.".to_string()
            }
            Self::AlreadyQueued { id } => format!("Download '{id}' is already in the queue."),
            Self::NotInQueue { id } => format!("Download '{id}' is not in the queue."),
            Self::Cancelled => "Download was cancelled.".to_string(),
            Self::Other { message } => message.clone(),
        }
    }
}

/// Convenience result type for download operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_becomes_transfer() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = DownloadError::from_io_error(&io_err);

        match err {
            DownloadError::Transfer { message } => {
                assert!(message.contains("ConnectionReset"));
                assert!(message.contains("peer reset"));
            }
            _ => panic!("Expected Transfer variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let err = DownloadError::invalid_transition(
            "t1",
            DownloadState::Completed,
            DownloadState::Paused,
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("completed"));

        let parsed: DownloadError = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, err);
    }

    #[test]
    fn test_kind_and_retryable() {
        assert_eq!(
            DownloadError::transfer("timeout").kind(),
            DownloadErrorKind::Transfer
        );
        assert!(DownloadError::transfer("timeout").is_retryable());
        assert!(!DownloadError::storage("disk full").is_retryable());
        assert!(!DownloadError::Cancelled.is_retryable());
        assert!(DownloadError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_into_transfer_wraps_other_kinds() {
        let wrapped = DownloadError::other("socket closed").into_transfer();
        assert_eq!(wrapped, DownloadError::transfer("socket closed"));

        let unchanged = DownloadError::transfer("dns").into_transfer();
        assert_eq!(unchanged, DownloadError::transfer("dns"));
    }

    #[test]
    fn test_user_messages() {
        let err = DownloadError::already_queued("abc");
        assert!(err.user_message().contains("abc"));
        assert!(DownloadError::storage("ro fs").user_message().contains("ro fs"));
    }
}
