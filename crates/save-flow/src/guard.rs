//! Terminal handling for a transaction.

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::SaveError;
use crate::transaction::{Transaction, TransactionState};
use crate::types::{SaveEvent, SaveOutcome};

/// Settles finished transactions: scratch deletion plus result delivery.
#[derive(Debug, Clone)]
pub struct LifecycleGuard {
    events_tx: mpsc::UnboundedSender<SaveEvent>,
}

impl LifecycleGuard {
    pub fn new(events_tx: mpsc::UnboundedSender<SaveEvent>) -> Self {
        Self { events_tx }
    }

    /// Moves `tx` to its terminal state and consumes it.
    ///
    /// The scratch file gets exactly one deletion attempt, which is a no-op
    /// when the transfer engine or the platform already removed it.
    pub fn settle(
        &self,
        mut tx: Transaction,
        result: Result<SaveOutcome, SaveError>,
    ) -> Result<SaveOutcome, SaveError> {
        let terminal = match &result {
            Ok(_) => TransactionState::Succeeded,
            Err(SaveError::UserCancelled | SaveError::Interrupted | SaveError::ShutDown) => {
                TransactionState::Cancelled
            }
            Err(_) => TransactionState::Failed,
        };
        let reached = tx.state();
        tx.advance(terminal);

        if let Some(mut scratch) = tx.take_scratch() {
            match scratch.remove() {
                Ok(true) if tx.consumed_scratch() => {
                    warn!(request_id = %tx.id(), "scratch file still present after hand-off, removed");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(request_id = %tx.id(), error = %e, "failed to delete scratch file");
                }
            }
        }

        match &result {
            Ok(outcome) => info!(
                request_id = %tx.id(),
                uri = %outcome.uri,
                bytes = outcome.bytes_written,
                elapsed_ms = tx.elapsed_ms() as u64,
                "save completed"
            ),
            Err(e) if terminal == TransactionState::Cancelled => info!(
                request_id = %tx.id(),
                stage = ?reached,
                reason = %e,
                "save cancelled"
            ),
            Err(e) => error!(
                request_id = %tx.id(),
                stage = ?reached,
                kind = %e.kind(),
                error = %e,
                destination = tx.destination().map(|d| d.uri.as_str()),
                written = tx.bytes_written(),
                total = tx.total_bytes(),
                "save failed"
            ),
        }

        result
    }

    /// Emits the terminal event for a settled transaction.
    ///
    /// Skipped entirely for results discarded by a reset.
    pub fn deliver(&self, request_id: &str, result: &Result<SaveOutcome, SaveError>) {
        let event = match result {
            Ok(outcome) => SaveEvent::Completed {
                request_id: request_id.to_string(),
                outcome: outcome.clone(),
            },
            Err(e) => SaveEvent::Failed {
                request_id: request_id.to_string(),
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        let _ = self.events_tx.send(event);
    }
}
