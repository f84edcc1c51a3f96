//! The per-request transaction record.

use std::path::Path;
use std::time::Instant;

use saveas_file_ops::ScratchFile;

use crate::platform::DestinationHandle;

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Created,
    Staging,
    Negotiating,
    Transferring,
    Succeeded,
    Cancelled,
    Failed,
}

impl TransactionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Staging => 1,
            Self::Negotiating => 2,
            Self::Transferring => 3,
            Self::Succeeded | Self::Cancelled | Self::Failed => 4,
        }
    }
}

/// One in-flight save request.
///
/// Owns the scratch file from staging until the
/// [`LifecycleGuard`](crate::LifecycleGuard) settles it.
#[derive(Debug)]
pub struct Transaction {
    id: String,
    state: TransactionState,
    scratch: Option<ScratchFile>,
    requested_name: String,
    /// Extension-normalized after staging, collision-free after negotiation.
    resolved_name: String,
    mime_type: String,
    total_bytes: u64,
    bytes_written: u64,
    destination: Option<DestinationHandle>,
    consumed_scratch: bool,
    started: Instant,
}

impl Transaction {
    pub fn new(id: impl Into<String>, requested_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TransactionState::Created,
            scratch: None,
            requested_name: requested_name.into(),
            resolved_name: String::new(),
            mime_type: String::new(),
            total_bytes: 0,
            bytes_written: 0,
            destination: None,
            consumed_scratch: false,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Moves to `next`. States only move forward; a terminal state is final.
    pub fn advance(&mut self, next: TransactionState) {
        if self.state.is_terminal() || next.rank() < self.state.rank() {
            tracing::warn!(
                request_id = %self.id,
                from = ?self.state,
                to = ?next,
                "ignoring backwards transaction state change"
            );
            return;
        }
        tracing::debug!(request_id = %self.id, from = ?self.state, to = ?next, "transaction state");
        self.state = next;
    }

    /// Takes ownership of the staged scratch file.
    pub fn attach_scratch(
        &mut self,
        scratch: ScratchFile,
        file_name: String,
        mime_type: String,
        total_bytes: u64,
    ) {
        self.scratch = Some(scratch);
        self.resolved_name = file_name;
        self.mime_type = mime_type;
        self.total_bytes = total_bytes;
    }

    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchFile::path)
    }

    /// Scratch file and transfer offset, borrowed together for the copy.
    pub fn transfer_parts(&mut self) -> Option<(&mut ScratchFile, &mut u64)> {
        let scratch = self.scratch.as_mut()?;
        Some((scratch, &mut self.bytes_written))
    }

    pub(crate) fn take_scratch(&mut self) -> Option<ScratchFile> {
        self.scratch.take()
    }

    /// Filename as the caller asked for it.
    pub fn requested_name(&self) -> &str {
        &self.requested_name
    }

    pub fn resolved_name(&self) -> &str {
        &self.resolved_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Current transfer offset.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn record_written(&mut self, bytes: u64) {
        self.bytes_written = bytes;
    }

    pub fn set_destination(
        &mut self,
        destination: DestinationHandle,
        resolved_name: String,
        consumed_scratch: bool,
    ) {
        self.destination = Some(destination);
        self.resolved_name = resolved_name;
        self.consumed_scratch = consumed_scratch;
    }

    pub fn destination(&self) -> Option<&DestinationHandle> {
        self.destination.as_ref()
    }

    pub fn consumed_scratch(&self) -> bool {
        self.consumed_scratch
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_forward_only() {
        let mut tx = Transaction::new("r1", "a");
        assert_eq!(tx.state(), TransactionState::Created);
        tx.advance(TransactionState::Staging);
        tx.advance(TransactionState::Negotiating);
        tx.advance(TransactionState::Staging);
        assert_eq!(tx.state(), TransactionState::Negotiating);
    }

    #[test]
    fn terminal_is_final() {
        let mut tx = Transaction::new("r1", "a");
        tx.advance(TransactionState::Cancelled);
        tx.advance(TransactionState::Succeeded);
        assert_eq!(tx.state(), TransactionState::Cancelled);
        assert!(tx.state().is_terminal());
    }

    #[test]
    fn owns_scratch_until_taken() {
        let dir = tempfile::tempdir().unwrap();
        let (scratch, _file) = ScratchFile::create_in(dir.path(), "a.txt").unwrap();
        let path = scratch.path().to_path_buf();

        let mut tx = Transaction::new("r1", "a");
        tx.attach_scratch(scratch, "a.txt".into(), "text/plain".into(), 0);
        assert_eq!(tx.scratch_path(), Some(path.as_path()));

        assert_eq!(tx.requested_name(), "a");
        assert_eq!(tx.resolved_name(), "a.txt");

        let taken = tx.take_scratch().unwrap();
        assert!(tx.scratch_path().is_none());
        drop(taken);
        assert!(!path.exists());
    }

    #[test]
    fn destination_carries_collision_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let (scratch, _file) = ScratchFile::create_in(dir.path(), "report.pdf").unwrap();

        let mut tx = Transaction::new("r1", "report.pdf");
        tx.attach_scratch(scratch, "report.pdf".into(), "application/pdf".into(), 8);
        tx.set_destination(
            DestinationHandle {
                uri: "file:///docs/report%20(2).pdf".into(),
                display_name: "report (2).pdf".into(),
            },
            "report (2).pdf".into(),
            false,
        );

        assert_eq!(tx.requested_name(), "report.pdf");
        assert_eq!(tx.resolved_name(), "report (2).pdf");
        assert_eq!(tx.destination().map(|d| d.display_name.as_str()), Some("report (2).pdf"));

        let (_, offset) = tx.transfer_parts().unwrap();
        *offset = 4;
        assert_eq!(tx.bytes_written(), 4);
    }
}
