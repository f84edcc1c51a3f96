//! Chunked scratch-to-destination copy with progress reporting.
//!
//! The engine streams a staged scratch file into an opaque async sink,
//! reports whole-percent progress as it goes, and always deletes the
//! scratch file before returning.

mod chunked;
mod engine;
mod progress;

pub use chunked::{ChunkReader, checksum_bytes};
pub use engine::{TransferReport, transfer};
pub use progress::{PercentTracker, Progress, percent_of};

/// Default chunk size: 32 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Smallest chunk size the engine will use.
pub const MIN_CHUNK_SIZE: usize = 16 * 1024;

/// Largest chunk size the engine will use.
pub const MAX_CHUNK_SIZE: usize = 256 * 1024;

/// Clamps a requested chunk size into the supported range.
///
/// `0` selects [`DEFAULT_CHUNK_SIZE`].
pub fn effective_chunk_size(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        requested.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }
}

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scratch file changed during transfer: expected {expected} bytes, read {actual}")]
    ShortRead { expected: u64, actual: u64 },
}
