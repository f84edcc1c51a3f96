//! Save error types.

use saveas_file_ops::StageError;
use saveas_protocol::{ErrorKind, ProtocolError};
use saveas_transfer::TransferError;

use crate::platform::PlatformError;

/// Terminal failure of a save transaction.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("User cancelled")]
    UserCancelled,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("another save is already in progress: {0}")]
    Busy(String),

    #[error("save service is shut down")]
    ShutDown,

    #[error("save interrupted")]
    Interrupted,
}

impl SaveError {
    /// Bridge error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaveError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SaveError::Decode(_) => ErrorKind::DecodeError,
            SaveError::UserCancelled => ErrorKind::UserCancelled,
            SaveError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            SaveError::Io(_) => ErrorKind::Io,
            SaveError::Busy(_) => ErrorKind::Busy,
            SaveError::Platform(_) | SaveError::ShutDown | SaveError::Interrupted => {
                ErrorKind::PlatformError
            }
        }
    }
}

impl From<ProtocolError> for SaveError {
    fn from(e: ProtocolError) -> Self {
        SaveError::InvalidArgument(e.to_string())
    }
}

impl From<StageError> for SaveError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::Decode(msg) => SaveError::Decode(msg),
            StageError::Io(e) => SaveError::Io(e),
        }
    }
}

impl From<TransferError> for SaveError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Io(e) => SaveError::Io(e),
            other @ TransferError::ShortRead { .. } => SaveError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                other.to_string(),
            )),
        }
    }
}

impl From<PlatformError> for SaveError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::PermissionDenied(msg) => SaveError::PermissionDenied(msg),
            PlatformError::Io(e) => SaveError::Io(e),
            other => SaveError::Platform(other.to_string()),
        }
    }
}
