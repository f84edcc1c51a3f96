//! Scripted platform for tests.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;
use tokio::sync::Notify;

use crate::local;
use crate::platform::{
    Container, DestinationHandle, PickedFile, PickerRequest, Platform, PlatformError,
    PlatformFuture, Sink, Strategy,
};

/// Directory-backed [`Platform`] with failure injection and call recording.
pub(crate) struct MockPlatform {
    root: tempfile::TempDir,
    strategy: Strategy,
    dismiss_container: bool,
    container_unavailable: bool,
    fail_grant: bool,
    fail_listing: bool,
    reject_create: bool,
    dismiss_picker: bool,
    consume_scratch: bool,
    sink_fail_after: Option<usize>,
    sink_stall_after: Option<usize>,
    stalled: Arc<Notify>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    calls: Mutex<Vec<&'static str>>,
    suggestions: Mutex<Vec<String>>,
}

impl MockPlatform {
    pub(crate) fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        for sub in ["container", "picked", "scratch"] {
            std::fs::create_dir(root.path().join(sub)).unwrap();
        }
        Self {
            root,
            strategy: Strategy::ContainerFirst,
            dismiss_container: false,
            container_unavailable: false,
            fail_grant: false,
            fail_listing: false,
            reject_create: false,
            dismiss_picker: false,
            consume_scratch: false,
            sink_fail_after: None,
            sink_stall_after: None,
            stalled: Arc::new(Notify::new()),
            gate: None,
            entered: Arc::new(Notify::new()),
            calls: Mutex::new(Vec::new()),
            suggestions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn picker_only(mut self) -> Self {
        self.strategy = Strategy::PickerOnly;
        self
    }

    pub(crate) fn dismiss_container(mut self) -> Self {
        self.dismiss_container = true;
        self
    }

    pub(crate) fn container_unavailable(mut self) -> Self {
        self.container_unavailable = true;
        self
    }

    pub(crate) fn fail_grant(mut self) -> Self {
        self.fail_grant = true;
        self
    }

    pub(crate) fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn reject_create(mut self) -> Self {
        self.reject_create = true;
        self
    }

    pub(crate) fn dismiss_picker(mut self) -> Self {
        self.dismiss_picker = true;
        self
    }

    pub(crate) fn consume_scratch(mut self) -> Self {
        self.consume_scratch = true;
        self
    }

    pub(crate) fn sink_fail_after(mut self, bytes: usize) -> Self {
        self.sink_fail_after = Some(bytes);
        self
    }

    /// Sink accepts `bytes`, then never completes another write.
    pub(crate) fn sink_stall_after(mut self, bytes: usize) -> Self {
        self.sink_stall_after = Some(bytes);
        self
    }

    /// Notified when a stalling sink stops accepting bytes.
    pub(crate) fn stalled(&self) -> Arc<Notify> {
        self.stalled.clone()
    }

    /// Holds the first chooser open until `gate` is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notified when a chooser is presented.
    pub(crate) fn entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }

    pub(crate) fn container_dir(&self) -> std::path::PathBuf {
        self.root.path().join("container")
    }

    pub(crate) fn picked_dir(&self) -> std::path::PathBuf {
        self.root.path().join("picked")
    }

    pub(crate) fn scratch_dir(&self) -> &Path {
        self.root.path()
    }

    pub(crate) fn seed_entry(&self, name: &str) {
        std::fs::write(self.container_dir().join(name), b"existing").unwrap();
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn picker_suggestions(&self) -> Vec<String> {
        self.suggestions.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_gate(&self) {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

impl Platform for MockPlatform {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn choose_container<'a>(
        &'a self,
        _suggested_name: &'a str,
    ) -> PlatformFuture<'a, Option<Container>> {
        Box::pin(async move {
            self.record("choose_container");
            self.wait_gate().await;
            if self.container_unavailable {
                return Err(PlatformError::Unavailable("no folder chooser".into()));
            }
            if self.dismiss_container {
                return Ok(None);
            }
            Ok(Some(local::container_for_dir(&self.container_dir())))
        })
    }

    fn persist_grant<'a>(&'a self, _container: &'a Container) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            self.record("persist_grant");
            if self.fail_grant {
                return Err(PlatformError::PermissionDenied("grant refused".into()));
            }
            Ok(())
        })
    }

    fn enumerate_entries<'a>(
        &'a self,
        container: &'a Container,
    ) -> PlatformFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.record("enumerate_entries");
            if self.fail_listing {
                return Err(PlatformError::Other("listing failed".into()));
            }
            local::list_entries(container)
        })
    }

    fn create_entry<'a>(
        &'a self,
        container: &'a Container,
        name: &'a str,
        _mime_type: &'a str,
    ) -> PlatformFuture<'a, DestinationHandle> {
        Box::pin(async move {
            self.record("create_entry");
            if self.reject_create {
                return Err(PlatformError::Rejected("provider cannot create".into()));
            }
            local::create_entry(container, name)
        })
    }

    fn choose_picker_file<'a>(
        &'a self,
        request: PickerRequest<'a>,
    ) -> PlatformFuture<'a, Option<PickedFile>> {
        Box::pin(async move {
            self.record("choose_picker_file");
            self.suggestions
                .lock()
                .unwrap()
                .push(request.suggested_name.to_string());
            if self.strategy == Strategy::PickerOnly {
                self.wait_gate().await;
            }
            if self.dismiss_picker {
                return Ok(None);
            }
            let path = self.picked_dir().join(request.suggested_name);
            if self.consume_scratch {
                std::fs::rename(request.scratch, &path)?;
            }
            Ok(Some(PickedFile {
                handle: local::handle_for_path(&path),
                consumed_scratch: self.consume_scratch,
            }))
        })
    }

    fn open_sink<'a>(&'a self, handle: &'a DestinationHandle) -> PlatformFuture<'a, Sink> {
        Box::pin(async move {
            self.record("open_sink");
            let sink = local::open_sink(handle).await?;
            Ok(match (self.sink_fail_after, self.sink_stall_after) {
                (Some(limit), _) => Box::new(FailingSink {
                    inner: sink,
                    remaining: limit,
                }) as Sink,
                (None, Some(limit)) => Box::new(StallingSink {
                    inner: sink,
                    remaining: limit,
                    stalled: self.stalled.clone(),
                }) as Sink,
                (None, None) => sink,
            })
        })
    }
}

/// Accepts `remaining` bytes, then fails every write.
pub(crate) struct FailingSink {
    inner: Sink,
    remaining: usize,
}

impl AsyncWrite for FailingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.remaining == 0 {
            return Poll::Ready(Err(io::Error::other("simulated destination fault")));
        }
        let n = buf.len().min(self.remaining);
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write(cx, &buf[..n]) {
            Poll::Ready(Ok(written)) => {
                this.remaining -= written;
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Accepts `remaining` bytes, then leaves every write pending.
pub(crate) struct StallingSink {
    inner: Sink,
    remaining: usize,
    stalled: Arc<Notify>,
}

impl AsyncWrite for StallingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.remaining == 0 {
            self.stalled.notify_one();
            return Poll::Pending;
        }
        let n = buf.len().min(self.remaining);
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write(cx, &buf[..n]) {
            Poll::Ready(Ok(written)) => {
                this.remaining -= written;
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
