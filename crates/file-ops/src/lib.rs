//! Payload staging, scratch-file ownership and collision-free naming.
//!
//! Everything here is synchronous; callers on an async runtime run
//! [`stage`] on the blocking pool.

mod names;
mod scratch;
mod staging;

pub use names::{DEFAULT_MAX_ATTEMPTS, resolve_free_name, split_name};
pub use scratch::{SCRATCH_PREFIX, ScratchFile};
pub use staging::{StageError, StagedPayload, decode_payload, normalize_file_name, stage};

/// Name of the private scratch directory under the system temp dir.
pub const SCRATCH_DIR_NAME: &str = "saveas";

/// Resolves the default scratch directory (`<temp>/saveas`).
pub fn default_scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(SCRATCH_DIR_NAME)
}
