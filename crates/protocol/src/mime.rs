//! Static extension/MIME lookup used for content-type and extension inference.

/// Generic binary content type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Known `(extension, mime)` pairs. The first entry for a MIME type is its
/// preferred extension.
const TABLE: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("html", "text/html"),
    ("zip", "application/zip"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Non-canonical MIME spellings seen in the wild.
const ALIASES: &[(&str, &str)] = &[("image/jpg", "image/jpeg")];

/// Returns the MIME type for an extension (without the leading dot).
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Returns the preferred extension (without the dot) for a MIME type.
///
/// Parameters such as `; charset=utf-8` are ignored. The binary fallback
/// type has no extension.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = essence(mime);
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == essence)
        .map(|(_, c)| *c)
        .unwrap_or(essence.as_str());
    TABLE
        .iter()
        .find(|(_, m)| *m == canonical)
        .map(|(ext, _)| *ext)
}

/// Infers a content type from a filename's trailing extension, falling back
/// to [`OCTET_STREAM`].
pub fn infer_mime_type(filename: &str) -> &'static str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => mime_for_extension(&filename[idx + 1..]).unwrap_or(OCTET_STREAM),
        _ => OCTET_STREAM,
    }
}

fn essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
