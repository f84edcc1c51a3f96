//! Progress surface (notification, status bar, ...).

use std::sync::atomic::{AtomicBool, Ordering};

/// Failure reported by a progress surface.
#[derive(Debug, thiserror::Error)]
#[error("progress surface unavailable: {0}")]
pub struct SurfaceError(pub String);

/// Somewhere to show transfer progress to the user.
///
/// Implementations may be unavailable (e.g. notifications denied); the
/// transfer never fails because of them.
pub trait ProgressSurface: Send + Sync {
    fn begin(&self, label: &str) -> Result<(), SurfaceError>;
    fn update(&self, percent: u8, label: &str) -> Result<(), SurfaceError>;
    fn end(&self) -> Result<(), SurfaceError>;
}

/// A surface that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSurface;

impl ProgressSurface for NoSurface {
    fn begin(&self, _label: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn update(&self, _percent: u8, _label: &str) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn end(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Per-transaction wrapper: the first failure disables the surface.
pub(crate) struct GuardedSurface<'a> {
    inner: &'a dyn ProgressSurface,
    label: &'a str,
    enabled: AtomicBool,
    begun: AtomicBool,
}

impl<'a> GuardedSurface<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressSurface, label: &'a str) -> Self {
        Self {
            inner,
            label,
            enabled: AtomicBool::new(true),
            begun: AtomicBool::new(false),
        }
    }

    pub(crate) fn begin(&self) {
        self.begun.store(true, Ordering::Relaxed);
        let result = self.inner.begin(self.label);
        self.check(result);
    }

    pub(crate) fn update(&self, percent: u8) {
        if self.enabled.load(Ordering::Relaxed) {
            let result = self.inner.update(percent, self.label);
            self.check(result);
        }
    }

    pub(crate) fn end(&self) {
        if self.begun.swap(false, Ordering::Relaxed) && self.enabled.load(Ordering::Relaxed) {
            let result = self.inner.end();
            self.check(result);
        }
    }

    fn check(&self, result: Result<(), SurfaceError>) {
        if let Err(e) = result {
            if self.enabled.swap(false, Ordering::Relaxed) {
                tracing::warn!(error = %e, "progress surface disabled for this save");
            }
        }
    }
}

impl Drop for GuardedSurface<'_> {
    fn drop(&mut self) {
        self.end();
    }
}
