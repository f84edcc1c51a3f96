use serde::{Deserialize, Serialize};

use crate::{DEFAULT_FILENAME, ProtocolError};

/// Error categories surfaced to the calling application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or missing call arguments; nothing was touched.
    InvalidArgument,
    /// Payload is not valid base64 or decodes to nothing.
    DecodeError,
    /// The user dismissed a chooser.
    UserCancelled,
    /// A required access grant is unavailable.
    PermissionDenied,
    /// Scratch or destination read/write failure.
    #[serde(rename = "IOError")]
    Io,
    /// Any other platform-primitive failure.
    PlatformError,
    /// Another save is still outstanding.
    Busy,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::UserCancelled => "UserCancelled",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::Io => "IOError",
            ErrorKind::PlatformError => "PlatformError",
            ErrorKind::Busy => "Busy",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details in a terminal `error` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeErrorDto {
    pub kind: ErrorKind,
    pub message: String,
}

/// Payload of a terminal `ok` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultDto {
    /// Location reference of the written destination.
    pub uri: String,
    /// Final name on the destination, which may differ from the request.
    pub display_name: String,
    pub requested_name: String,
    pub bytes_written: u64,
    /// Hex SHA-256 of the delivered bytes (empty when the platform moved
    /// the scratch file itself).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha256: String,
}

/// Validated arguments of a `saveBase64` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Base64 payload, possibly still carrying a `data:...;base64,` prefix.
    /// May be empty; decoding reports that as a decode error.
    pub payload: String,
    pub filename: String,
    /// Declared content type; inferred from the filename when `None`.
    pub mime_type: Option<String>,
}

impl SaveRequest {
    /// Builds a request, applying defaults and validating the arguments.
    pub fn new(
        payload: impl Into<String>,
        filename: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<Self, ProtocolError> {
        let filename = match filename.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_FILENAME.to_string(),
        };
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let req = Self {
            payload: payload.into(),
            filename,
            mime_type,
        };
        req.validate()?;
        Ok(req)
    }

    /// Parses the positional bridge arguments `[payload, filename?, mimeType?]`.
    pub fn from_args(args: &[serde_json::Value]) -> Result<Self, ProtocolError> {
        let payload = match args.first() {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => {
                return Err(ProtocolError::InvalidArgument(
                    "payload is required".into(),
                ));
            }
            Some(_) => {
                return Err(ProtocolError::InvalidArgument(
                    "payload must be a string".into(),
                ));
            }
        };
        let filename = optional_string(args.get(1), "filename")?;
        let mime_type = optional_string(args.get(2), "mimeType")?;
        Self::new(payload, filename, mime_type)
    }

    /// Checks the invariants every accepted request satisfies.
    ///
    /// An empty payload string is accepted here; decoding rejects it later.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        validate_filename(&self.filename)
    }
}

fn optional_string<'a>(
    value: Option<&'a serde_json::Value>,
    field: &str,
) -> Result<Option<&'a str>, ProtocolError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ProtocolError::InvalidArgument(format!(
            "{field} must be a string"
        ))),
    }
}

/// Rejects names that could escape the destination container.
fn validate_filename(name: &str) -> Result<(), ProtocolError> {
    if name.is_empty() {
        return Err(ProtocolError::InvalidArgument("empty filename".into()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(ProtocolError::InvalidArgument(format!(
            "filename must not contain path separators: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(ProtocolError::InvalidArgument(format!(
            "filename not allowed: {name}"
        )));
    }
    Ok(())
}
