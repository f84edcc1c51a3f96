//! Directory-backed destinations for desktop hosts and tests.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::platform::{Container, DestinationHandle, PlatformError, Sink};

const FILE_SCHEME: &str = "file://";

/// Unreserved URI characters plus the path separator stay literal.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// `file://` URI for a local path. Every path byte survives the round
/// trip through [`path_from_uri`], including non-UTF-8 ones.
pub fn file_uri(path: &Path) -> String {
    format!(
        "{FILE_SCHEME}{}",
        percent_encode(&path_bytes(path), PATH_ENCODE_SET)
    )
}

/// Inverse of [`file_uri`]; `None` for other schemes.
pub fn path_from_uri(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix(FILE_SCHEME)
        .filter(|p| !p.is_empty())
        .map(|p| path_from_bytes(percent_decode_str(p).collect()))
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    Cow::Owned(path.to_string_lossy().replace('\\', "/").into_bytes())
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Wraps a local directory as a container.
pub fn container_for_dir(dir: &Path) -> Container {
    Container {
        uri: file_uri(dir),
        label: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string()),
    }
}

/// Wraps a local file path as a destination.
pub fn handle_for_path(path: &Path) -> DestinationHandle {
    DestinationHandle {
        uri: file_uri(path),
        display_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn container_path(container: &Container) -> Result<PathBuf, PlatformError> {
    path_from_uri(&container.uri)
        .ok_or_else(|| PlatformError::Unavailable(format!("not a local folder: {}", container.uri)))
}

/// Names of the entries directly inside `container`.
pub fn list_entries(container: &Container) -> Result<Vec<String>, PlatformError> {
    let dir = container_path(container)?;
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Creates an empty file called `name` inside `container`.
///
/// Never overwrites: an existing entry maps to [`PlatformError::Rejected`].
pub fn create_entry(container: &Container, name: &str) -> Result<DestinationHandle, PlatformError> {
    let path = container_path(container)?.join(name);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(_) => Ok(handle_for_path(&path)),
        Err(e) => Err(map_io(e, &path)),
    }
}

/// Opens `handle` for writing, truncating anything already there.
pub async fn open_sink(handle: &DestinationHandle) -> Result<Sink, PlatformError> {
    let path = path_from_uri(&handle.uri)
        .ok_or_else(|| PlatformError::Other(format!("not a local file: {}", handle.uri)))?;
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .await
        .map_err(|e| map_io(e, &path))?;
    Ok(Box::new(file))
}

fn map_io(e: io::Error, path: &Path) -> PlatformError {
    match e.kind() {
        io::ErrorKind::AlreadyExists => {
            PlatformError::Rejected(format!("{} already exists", path.display()))
        }
        io::ErrorKind::PermissionDenied => PlatformError::PermissionDenied(path.display().to_string()),
        _ => PlatformError::Io(e),
    }
}
