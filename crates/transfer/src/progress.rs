/// A progress sample emitted after a chunk lands in the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub written: u64,
    pub total: u64,
    pub percent: u8,
}

/// Whole-percent completion, `floor(written * 100 / total)`, capped at 100.
///
/// A zero-byte total counts as complete.
pub fn percent_of(written: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (written as u128 * 100) / total as u128;
    pct.min(100) as u8
}

/// Emits a percentage only when it differs from the last one emitted.
#[derive(Debug, Clone)]
pub struct PercentTracker {
    total: u64,
    last: Option<u8>,
}

impl PercentTracker {
    /// Creates a tracker for a transfer of `total` bytes.
    pub fn new(total: u64) -> Self {
        Self { total, last: None }
    }

    /// Records `written` bytes so far; returns a sample if the percentage moved.
    pub fn update(&mut self, written: u64) -> Option<Progress> {
        let percent = percent_of(written, self.total);
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(Progress {
            written,
            total: self.total,
            percent,
        })
    }

    /// Last percentage emitted, if any.
    pub fn last(&self) -> Option<u8> {
        self.last
    }
}
