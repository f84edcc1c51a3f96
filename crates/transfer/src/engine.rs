use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use saveas_file_ops::ScratchFile;

use crate::chunked::ChunkReader;
use crate::progress::{PercentTracker, Progress};
use crate::{TransferError, effective_chunk_size};

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes_written: u64,
    /// Hex SHA-256 of the bytes written to the sink.
    pub sha256: String,
}

/// Streams `scratch` into `sink` in bounded chunks.
///
/// `offset` is advanced after every chunk that reaches the sink, so on
/// failure it holds the number of bytes the destination received.
/// `on_progress` is called in chunk order whenever the whole percentage
/// changes; the last call reports 100. A zero-byte scratch file reports 100
/// once without writing. The sink is flushed before success is declared.
///
/// The scratch file is deleted before returning on every path; a deletion
/// failure is logged, not returned. A partially written destination is left
/// in place since it belongs to the user.
pub async fn transfer<W>(
    scratch: &mut ScratchFile,
    sink: &mut W,
    chunk_size: usize,
    offset: &mut u64,
    mut on_progress: impl FnMut(Progress),
) -> Result<TransferReport, TransferError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    *offset = 0;
    let result = copy_chunks(
        scratch,
        sink,
        effective_chunk_size(chunk_size),
        offset,
        &mut on_progress,
    )
    .await;
    scratch.remove_quietly();

    match &result {
        Ok(report) => tracing::debug!(
            bytes = report.bytes_written,
            sha256 = %report.sha256,
            "transfer complete"
        ),
        Err(e) => tracing::warn!(error = %e, written = *offset, "transfer failed"),
    }
    result
}

async fn copy_chunks<W>(
    scratch: &ScratchFile,
    sink: &mut W,
    chunk_size: usize,
    offset: &mut u64,
    on_progress: &mut impl FnMut(Progress),
) -> Result<TransferReport, TransferError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut reader = ChunkReader::open(scratch.path(), chunk_size).await?;
    let total = reader.file_size();
    let mut tracker = PercentTracker::new(total);
    let mut hasher = Sha256::new();

    if total == 0 {
        sink.flush().await?;
        if let Some(p) = tracker.update(0) {
            on_progress(p);
        }
        return Ok(TransferReport {
            bytes_written: 0,
            sha256: hex::encode(hasher.finalize()),
        });
    }

    while let Some(chunk) = reader.next_chunk().await? {
        sink.write_all(chunk).await?;
        hasher.update(chunk);
        *offset = reader.offset();

        if let Some(p) = tracker.update(*offset) {
            on_progress(p);
        }
    }

    let written = reader.offset();
    if written != total {
        return Err(TransferError::ShortRead {
            expected: total,
            actual: written,
        });
    }

    sink.flush().await?;

    Ok(TransferReport {
        bytes_written: written,
        sha256: hex::encode(hasher.finalize()),
    })
}
