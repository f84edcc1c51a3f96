//! Payload decoding and scratch staging.

use std::io::Write;
use std::path::Path;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use saveas_protocol::mime;

use crate::names::split_name;
use crate::scratch::ScratchFile;

/// Standard alphabet, padding optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while staging a payload.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A decoded payload persisted to its scratch file.
#[derive(Debug)]
pub struct StagedPayload {
    pub scratch: ScratchFile,
    /// Extension-normalized filename.
    pub file_name: String,
    /// Declared or inferred content type.
    pub mime_type: String,
    /// Decoded length in bytes.
    pub size: u64,
}

/// Decodes a base64 payload.
///
/// A leading `data:...;base64,` prefix is stripped and ASCII whitespace is
/// ignored. An empty input, invalid base64 or an empty decoded result are
/// all [`StageError::Decode`].
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, StageError> {
    let trimmed = encoded.trim();
    let body = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| StageError::Decode("data URI without payload".into()))?,
        None => trimmed,
    };

    let cleaned: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(StageError::Decode("payload is empty".into()));
    }

    let data = LENIENT
        .decode(cleaned.as_bytes())
        .map_err(|e| StageError::Decode(e.to_string()))?;
    if data.is_empty() {
        return Err(StageError::Decode("payload decodes to zero bytes".into()));
    }
    Ok(data)
}

/// Appends an extension derived from `mime_type` when `name` has none.
///
/// Names that already carry an extension, and types with no mapping, are
/// returned trimmed but otherwise unchanged.
pub fn normalize_file_name(name: &str, mime_type: &str) -> String {
    let trimmed = name.trim();
    let (_, ext) = split_name(trimmed);
    if !ext.is_empty() {
        return trimmed.to_string();
    }
    match mime::extension_for_mime(mime_type) {
        Some(ext) => format!("{trimmed}.{ext}"),
        None => trimmed.to_string(),
    }
}

/// Decodes `encoded` and writes it to a fresh scratch file in `scratch_dir`.
///
/// The content type is `declared_type` when given, otherwise inferred from
/// `desired_name`. A partially written scratch file is removed before an
/// I/O error is returned.
pub fn stage(
    encoded: &str,
    desired_name: &str,
    declared_type: Option<&str>,
    scratch_dir: &Path,
) -> Result<StagedPayload, StageError> {
    let data = decode_payload(encoded)?;

    let mime_type = declared_type
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| mime::infer_mime_type(desired_name.trim()).to_string());
    let file_name = normalize_file_name(desired_name, &mime_type);

    let (mut scratch, mut file) = ScratchFile::create_in(scratch_dir, &file_name)?;
    let written = file.write_all(&data).and_then(|()| file.flush());
    drop(file);
    if let Err(e) = written {
        scratch.remove_quietly();
        return Err(e.into());
    }

    tracing::debug!(
        path = %scratch.path().display(),
        file_name = %file_name,
        mime_type = %mime_type,
        bytes = data.len(),
        "payload staged"
    );

    Ok(StagedPayload {
        scratch,
        file_name,
        mime_type,
        size: data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain() {
        assert_eq!(decode_payload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn decode_strips_data_uri_prefix() {
        let data = decode_payload("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn decode_ignores_whitespace_and_missing_padding() {
        assert_eq!(decode_payload(" aGVs\nbG8 ").unwrap(), b"hello");
        assert_eq!(decode_payload("aGVsbG8").unwrap(), b"hello");
    }

    #[test]
    fn decode_rejects_empty_and_garbage() {
        assert!(matches!(decode_payload(""), Err(StageError::Decode(_))));
        assert!(matches!(decode_payload("   "), Err(StageError::Decode(_))));
        assert!(matches!(
            decode_payload("data:text/plain;base64,"),
            Err(StageError::Decode(_))
        ));
        assert!(matches!(
            decode_payload("not base64!!"),
            Err(StageError::Decode(_))
        ));
    }

    #[test]
    fn normalize_appends_mapped_extension() {
        assert_eq!(normalize_file_name("report", "application/pdf"), "report.pdf");
        assert_eq!(normalize_file_name(" photo ", "image/jpeg"), "photo.jpg");
    }

    #[test]
    fn normalize_keeps_existing_extension() {
        assert_eq!(normalize_file_name("notes.md", "application/pdf"), "notes.md");
    }

    #[test]
    fn normalize_leaves_unmapped_names() {
        assert_eq!(
            normalize_file_name("greeting", mime::OCTET_STREAM),
            "greeting"
        );
        assert_eq!(normalize_file_name(".env", "text/plain"), ".env.txt");
    }

    #[test]
    fn stage_writes_decoded_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage("aGVsbG8=", "greeting", None, dir.path()).unwrap();

        assert_eq!(staged.file_name, "greeting");
        assert_eq!(staged.mime_type, mime::OCTET_STREAM);
        assert_eq!(staged.size, 5);
        assert_eq!(std::fs::read(staged.scratch.path()).unwrap(), b"hello");
    }

    #[test]
    fn stage_infers_type_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage("aGVsbG8=", "report.pdf", None, dir.path()).unwrap();
        assert_eq!(staged.mime_type, "application/pdf");
        assert_eq!(staged.file_name, "report.pdf");
    }

    #[test]
    fn stage_uses_declared_type_for_extension() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage("aGVsbG8=", "export", Some("text/csv"), dir.path()).unwrap();
        assert_eq!(staged.mime_type, "text/csv");
        assert_eq!(staged.file_name, "export.csv");
    }

    #[test]
    fn stage_accepts_longest_legal_name() {
        let dir = tempfile::tempdir().unwrap();
        let name = format!("{}.txt", "a".repeat(246));
        assert_eq!(name.len(), 250);

        let staged = stage("aGVsbG8=", &name, None, dir.path()).unwrap();
        assert_eq!(staged.file_name, name);
        assert_eq!(std::fs::read(staged.scratch.path()).unwrap(), b"hello");
    }

    #[test]
    fn stage_decode_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = stage("", "a.txt", None, dir.path());
        assert!(matches!(result, Err(StageError::Decode(_))));
        // Nothing was created, not even the scratch directory contents.
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 0);
    }

    #[test]
    fn stage_io_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the scratch directory should be.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let result = stage("aGVsbG8=", "a.txt", None, &blocker);
        assert!(matches!(result, Err(StageError::Io(_))));
    }
}
