use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::types::{BridgeErrorDto, ErrorKind, SaveResultDto};

/// A call marshalled by the bridge.
///
/// Arguments are positional, mirroring the JavaScript call site:
/// `saveBase64(payload, filename, mimeType)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

/// Actions understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Decode, stage and hand a payload to the OS save flow.
    SaveBase64,
    /// The calling UI context was reloaded; drop any pending result.
    Reset,
}

impl BridgeRequest {
    /// Parses one line of bridge input.
    pub fn from_line(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Resolves the action name.
    pub fn action(&self) -> Result<Action, ProtocolError> {
        match self.action.as_str() {
            "saveBase64" => Ok(Action::SaveBase64),
            "reset" => Ok(Action::Reset),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// Lifecycle position of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// Request accepted; the real result follows later.
    Pending,
    /// Transfer progress update.
    Progress,
    /// Terminal success.
    Ok,
    /// Terminal failure.
    Error,
}

impl ReplyStatus {
    /// Whether no further replies follow for the same request.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReplyStatus::Ok | ReplyStatus::Error)
    }
}

/// A message sent back across the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub id: String,
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SaveResultDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BridgeErrorDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<u8>,
}

impl BridgeReply {
    fn bare(id: impl Into<String>, status: ReplyStatus) -> Self {
        Self {
            id: id.into(),
            status,
            result: None,
            error: None,
            percent: None,
        }
    }

    /// Immediate acknowledgment for an accepted request.
    pub fn pending(id: impl Into<String>) -> Self {
        Self::bare(id, ReplyStatus::Pending)
    }

    /// Progress update, clamped to 0..=100.
    pub fn progress(id: impl Into<String>, percent: u8) -> Self {
        Self {
            percent: Some(percent.min(100)),
            ..Self::bare(id, ReplyStatus::Progress)
        }
    }

    /// Terminal success.
    pub fn ok(id: impl Into<String>, result: SaveResultDto) -> Self {
        Self {
            result: Some(result),
            ..Self::bare(id, ReplyStatus::Ok)
        }
    }

    /// Terminal failure.
    pub fn error(id: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: Some(BridgeErrorDto {
                kind,
                message: message.into(),
            }),
            ..Self::bare(id, ReplyStatus::Error)
        }
    }

    /// Serializes the reply as a single JSON line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
