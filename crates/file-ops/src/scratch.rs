//! Transaction-scoped scratch files.

use std::path::{Path, PathBuf};

use crate::names::split_name;

/// Filename prefix of every scratch file.
pub const SCRATCH_PREFIX: &str = "saveas_";

/// Longest extension carried over from the name hint, dot included.
const MAX_SCRATCH_EXT: usize = 16;

/// A private file holding decoded payload bytes before hand-off.
///
/// Owned by exactly one transaction. Deletion is idempotent and attempted
/// at most once; a scratch file dropped without an explicit
/// [`remove`](Self::remove) is deleted on drop.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    /// Creates a uniquely named, empty scratch file inside `dir`.
    ///
    /// The name is a random token plus the hint's extension, so it never
    /// collides with another transaction's scratch file and stays short
    /// whatever the length of the hint.
    pub fn create_in(dir: &Path, name_hint: &str) -> std::io::Result<(Self, std::fs::File)> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!(
            "{SCRATCH_PREFIX}{}{}",
            uuid::Uuid::new_v4().simple(),
            scratch_extension(name_hint)
        ));

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        tracing::debug!(path = %path.display(), "created scratch file");
        Ok((
            Self {
                path,
                removed: false,
            },
            file,
        ))
    }

    /// Location of the scratch file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a deletion has already been attempted.
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Deletes the file.
    ///
    /// Returns `Ok(true)` if a file was removed, `Ok(false)` if it was
    /// already gone (moved by a platform picker, or removed earlier).
    pub fn remove(&mut self) -> std::io::Result<bool> {
        if self.removed {
            return Ok(false);
        }
        self.removed = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed scratch file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes the file, logging instead of returning a failure.
    pub fn remove_quietly(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch file"
            );
        }
    }
}

/// Extension of `name_hint` when it is short and plain alphanumeric.
fn scratch_extension(name_hint: &str) -> &str {
    let (_, ext) = split_name(name_hint);
    let plain = ext.len() > 1
        && ext.len() <= MAX_SCRATCH_EXT
        && ext[1..].chars().all(|c| c.is_ascii_alphanumeric());
    if plain { ext } else { "" }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.removed {
            self.remove_quietly();
        }
    }
}
