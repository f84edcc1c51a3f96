//! Bridge protocol types for the native Save As host.
//!
//! The calling application talks to the host through a thin bridge that
//! marshals a `saveBase64` call into a [`BridgeRequest`] and receives
//! [`BridgeReply`] messages back: an immediate `pending` acknowledgment,
//! zero or more `progress` updates, then exactly one `ok` or `error`.

pub mod envelope;
pub mod mime;
pub mod types;

pub use envelope::{Action, BridgeReply, BridgeRequest, ReplyStatus};
pub use types::{BridgeErrorDto, ErrorKind, SaveRequest, SaveResultDto};

/// Filename used when the caller supplies none.
pub const DEFAULT_FILENAME: &str = "file.bin";

/// Errors produced while parsing bridge input.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),
}

impl ProtocolError {
    /// Bridge error kind reported for this failure.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}
