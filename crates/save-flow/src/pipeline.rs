//! The staged save pipeline: stage, negotiate, transfer.

use std::future::Future;

use saveas_file_ops::StagedPayload;
use saveas_protocol::SaveRequest;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SaveError;
use crate::negotiator::Negotiator;
use crate::platform::Platform;
use crate::surface::{GuardedSurface, ProgressSurface};
use crate::transaction::{Transaction, TransactionState};
use crate::types::{SaveConfig, SaveEvent, SaveOutcome};

/// Runs one transaction through its non-terminal stages.
///
/// Terminal handling (scratch deletion, result delivery) belongs to the
/// [`LifecycleGuard`](crate::LifecycleGuard); `run` leaves the scratch file
/// on `tx` for it.
///
/// Once `cancel` fires, `run` returns [`SaveError::Interrupted`] at the next
/// await point. A staging write already on the blocking pool is waited for
/// and its scratch file removed before `run` returns.
pub struct SavePipeline<'a> {
    platform: &'a dyn Platform,
    config: &'a SaveConfig,
    surface: &'a dyn ProgressSurface,
    events_tx: &'a mpsc::UnboundedSender<SaveEvent>,
    cancel: &'a CancellationToken,
}

impl<'a> SavePipeline<'a> {
    pub fn new(
        platform: &'a dyn Platform,
        config: &'a SaveConfig,
        surface: &'a dyn ProgressSurface,
        events_tx: &'a mpsc::UnboundedSender<SaveEvent>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            platform,
            config,
            surface,
            events_tx,
            cancel,
        }
    }

    pub async fn run(
        &self,
        tx: &mut Transaction,
        request: SaveRequest,
    ) -> Result<SaveOutcome, SaveError> {
        request.validate()?;

        // 1. Stage
        tx.advance(TransactionState::Staging);
        let StagedPayload {
            scratch,
            file_name,
            mime_type,
            size,
        } = self.stage(request).await?;
        tx.attach_scratch(scratch, file_name, mime_type, size);

        // 2. Negotiate
        tx.advance(TransactionState::Negotiating);
        let scratch_path = tx
            .scratch_path()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| SaveError::Platform("scratch file missing after staging".into()))?;
        let mut negotiator = Negotiator::new(self.platform, self.config);
        let negotiated = self
            .cancellable(negotiator.negotiate(tx.resolved_name(), tx.mime_type(), &scratch_path))
            .await?;
        tx.set_destination(
            negotiated.destination,
            negotiated.resolved_name,
            negotiated.consumed_scratch,
        );

        // 3. Transfer
        tx.advance(TransactionState::Transferring);
        let request_id = tx.id().to_string();
        let surface = GuardedSurface::new(self.surface, &self.config.progress_label);
        surface.begin();
        let emit = |percent: u8| {
            let _ = self.events_tx.send(SaveEvent::Progress {
                request_id: request_id.clone(),
                percent,
            });
            surface.update(percent);
        };

        let destination = tx
            .destination()
            .cloned()
            .ok_or_else(|| SaveError::Platform("destination missing after negotiation".into()))?;

        let sha256 = if tx.consumed_scratch() {
            debug!(request_id = %request_id, "platform took the scratch file, skipping copy");
            tx.record_written(tx.total_bytes());
            emit(100);
            String::new()
        } else {
            let chunk_size = self.config.chunk_size;
            let (scratch, offset) = tx
                .transfer_parts()
                .ok_or_else(|| SaveError::Platform("scratch file missing before transfer".into()))?;
            self.cancellable(async {
                let mut sink = self.platform.open_sink(&destination).await?;
                let report = saveas_transfer::transfer(
                    scratch,
                    sink.as_mut(),
                    chunk_size,
                    offset,
                    |p| emit(p.percent),
                )
                .await?;
                Ok::<_, SaveError>(report.sha256)
            })
            .await?
        };
        surface.end();

        Ok(SaveOutcome {
            uri: destination.uri,
            display_name: destination.display_name,
            requested_name: tx.requested_name().to_string(),
            bytes_written: tx.bytes_written(),
            sha256,
        })
    }

    /// Runs `fut` unless the transaction is cancelled first.
    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, SaveError>>,
    ) -> Result<T, SaveError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SaveError::Interrupted),
            r = fut => r,
        }
    }

    async fn stage(&self, request: SaveRequest) -> Result<StagedPayload, SaveError> {
        if self.cancel.is_cancelled() {
            return Err(SaveError::Interrupted);
        }
        let scratch_dir = self.config.scratch_dir.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            saveas_file_ops::stage(
                &request.payload,
                &request.filename,
                request.mime_type.as_deref(),
                &scratch_dir,
            )
        });

        let joined = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                // The write cannot be interrupted; its scratch file must be
                // gone before the transaction settles.
                if let Ok(Ok(mut staged)) = task.await {
                    staged.scratch.remove_quietly();
                }
                return Err(SaveError::Interrupted);
            }
            joined = &mut task => joined,
        };
        let staged =
            joined.map_err(|e| SaveError::Platform(format!("staging task failed: {e}")))??;
        Ok(staged)
    }
}
