//! Configuration, outcome and event types for the save flow.

use std::path::PathBuf;

use saveas_protocol::{ErrorKind, SaveResultDto};
use serde::Serialize;

/// Tunables for one [`SaveService`](crate::SaveService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveConfig {
    /// Private directory for scratch files.
    pub scratch_dir: PathBuf,
    /// Transfer chunk size in bytes; `0` picks the engine default.
    pub chunk_size: usize,
    /// `name (n).ext` attempts before the timestamp fallback.
    pub max_name_attempts: u32,
    /// Fail with `PermissionDenied` when a container grant cannot be persisted.
    pub require_persisted_grant: bool,
    /// Label shown on the progress surface.
    pub progress_label: String,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            scratch_dir: saveas_file_ops::default_scratch_dir(),
            chunk_size: saveas_transfer::DEFAULT_CHUNK_SIZE,
            max_name_attempts: saveas_file_ops::DEFAULT_MAX_ATTEMPTS,
            require_persisted_grant: false,
            progress_label: "Saving file".into(),
        }
    }
}

/// Successful end of a save transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub uri: String,
    pub display_name: String,
    pub requested_name: String,
    pub bytes_written: u64,
    /// Empty when the platform moved the scratch file itself.
    pub sha256: String,
}

impl SaveOutcome {
    /// Converts to the bridge result.
    pub fn to_dto(&self) -> SaveResultDto {
        SaveResultDto {
            uri: self.uri.clone(),
            display_name: self.display_name.clone(),
            requested_name: self.requested_name.clone(),
            bytes_written: self.bytes_written,
            sha256: self.sha256.clone(),
        }
    }
}

/// Event emitted while a transaction runs.
///
/// For each request id, `Started` comes first and exactly one of
/// `Completed`/`Failed` comes last, unless the result was discarded by a
/// reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SaveEvent {
    Started {
        request_id: String,
    },
    Progress {
        request_id: String,
        percent: u8,
    },
    Completed {
        request_id: String,
        outcome: SaveOutcome,
    },
    Failed {
        request_id: String,
        kind: ErrorKind,
        message: String,
    },
}

impl SaveEvent {
    /// Request id this event belongs to.
    pub fn request_id(&self) -> &str {
        match self {
            SaveEvent::Started { request_id }
            | SaveEvent::Progress { request_id, .. }
            | SaveEvent::Completed { request_id, .. }
            | SaveEvent::Failed { request_id, .. } => request_id,
        }
    }

    /// Whether this is the last event for its request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaveEvent::Completed { .. } | SaveEvent::Failed { .. })
    }
}
