//! Request orchestration: one active transaction at a time.
//!
//! A second request while one is outstanding is rejected with
//! [`SaveError::Busy`] before any I/O. Results for a transaction are
//! delivered once, through [`SaveService::save`] or a [`PendingSave`], and
//! mirrored on the event channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use saveas_protocol::SaveRequest;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::SaveError;
use crate::guard::LifecycleGuard;
use crate::pipeline::SavePipeline;
use crate::platform::Platform;
use crate::surface::{NoSurface, ProgressSurface};
use crate::transaction::Transaction;
use crate::types::{SaveConfig, SaveEvent, SaveOutcome};

/// Entry point for Save As requests.
pub struct SaveService {
    inner: Arc<Inner>,
    events_rx: Option<mpsc::UnboundedReceiver<SaveEvent>>,
}

struct Inner {
    platform: Arc<dyn Platform>,
    surface: Arc<dyn ProgressSurface>,
    config: SaveConfig,
    events_tx: mpsc::UnboundedSender<SaveEvent>,
    guard: LifecycleGuard,
    slot: Mutex<Slot>,
    idle: Notify,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct Slot {
    active: Option<Active>,
    /// Transactions not yet fully delivered, including one whose slot was
    /// already released.
    running: usize,
    shut_down: bool,
}

struct Active {
    request_id: String,
    cancel: CancellationToken,
    discarded: Arc<AtomicBool>,
}

/// Exclusive claim on the active-transaction slot.
///
/// The slot is freed by [`release`](Self::release) or on drop; the service
/// counts as idle only once every lease is dropped.
struct SlotLease {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    discarded: Arc<AtomicBool>,
    released: bool,
}

impl SlotLease {
    /// Frees the slot for the next request. Returns whether the result
    /// should still be delivered.
    fn release(&mut self) -> bool {
        let mut slot = self.inner.lock_slot();
        if !self.released {
            slot.active = None;
            self.released = true;
        }
        !self.discarded.load(Ordering::Acquire)
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        {
            let mut slot = self.inner.lock_slot();
            if !self.released {
                slot.active = None;
            }
            slot.running -= 1;
        }
        self.inner.idle.notify_waiters();
    }
}

/// A submitted request whose result arrives later.
pub struct PendingSave {
    rx: oneshot::Receiver<Result<SaveOutcome, SaveError>>,
}

impl PendingSave {
    /// Waits for the result; `None` when it was discarded by
    /// [`SaveService::reset`].
    pub async fn outcome(self) -> Option<Result<SaveOutcome, SaveError>> {
        self.rx.await.ok()
    }
}

impl SaveService {
    pub fn new(platform: Arc<dyn Platform>, config: SaveConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Inner {
            platform,
            surface: Arc::new(NoSurface),
            config,
            guard: LifecycleGuard::new(events_tx.clone()),
            events_tx,
            slot: Mutex::new(Slot::default()),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
        };
        Self {
            inner: Arc::new(inner),
            events_rx: Some(events_rx),
        }
    }

    /// Replaces the progress surface. Must be called before the first request.
    pub fn with_surface(mut self, surface: Arc<dyn ProgressSurface>) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.surface = surface,
            None => tracing::warn!("progress surface set on a running service, ignored"),
        }
        self
    }

    pub fn config(&self) -> &SaveConfig {
        &self.inner.config
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SaveEvent>> {
        self.events_rx.take()
    }

    /// Id of the outstanding request, if any.
    pub fn active_request(&self) -> Option<String> {
        self.inner
            .lock_slot()
            .active
            .as_ref()
            .map(|a| a.request_id.clone())
    }

    /// Runs one request to completion on the caller's task.
    ///
    /// A reset while this runs yields [`SaveError::Interrupted`].
    pub async fn save(
        &self,
        request_id: &str,
        request: SaveRequest,
    ) -> Result<SaveOutcome, SaveError> {
        let mut lease = self.inner.acquire(request_id)?;
        let (result, _) = self.inner.execute(&mut lease, request_id, request).await;
        result
    }

    /// Starts a request in the background and returns immediately.
    ///
    /// Busy and shut-down rejections are returned here, before any work.
    pub fn submit(
        &self,
        request_id: &str,
        request: SaveRequest,
    ) -> Result<PendingSave, SaveError> {
        let mut lease = self.inner.acquire(request_id)?;
        let (tx, rx) = oneshot::channel();
        let inner = self.inner.clone();
        let id = request_id.to_string();
        tokio::spawn(async move {
            let (result, delivered) = inner.execute(&mut lease, &id, request).await;
            if delivered {
                let _ = tx.send(result);
            }
            drop(lease);
        });
        Ok(PendingSave { rx })
    }

    /// Abandons the outstanding request after a UI reset.
    ///
    /// Its result is never delivered; scratch cleanup still runs. Returns
    /// whether a request was outstanding.
    pub fn reset(&self) -> bool {
        let slot = self.inner.lock_slot();
        match &slot.active {
            Some(active) => {
                info!(request_id = %active.request_id, "reset, discarding outstanding save");
                active.discarded.store(true, Ordering::Release);
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels in-flight work, waits for its cleanup, and refuses new
    /// requests from then on.
    pub async fn shutdown(&self) {
        {
            let mut slot = self.inner.lock_slot();
            if !slot.shut_down {
                info!("save service shutting down");
            }
            slot.shut_down = true;
        }
        self.inner.shutdown.cancel();
        self.inner.wait_idle().await;
        debug!("save service idle");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock_slot().shut_down
    }
}

impl Inner {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(self: &Arc<Self>, request_id: &str) -> Result<SlotLease, SaveError> {
        let mut slot = self.lock_slot();
        if slot.shut_down {
            return Err(SaveError::ShutDown);
        }
        if let Some(active) = &slot.active {
            debug!(request_id, active = %active.request_id, "rejecting concurrent save");
            return Err(SaveError::Busy(active.request_id.clone()));
        }
        let cancel = self.shutdown.child_token();
        let discarded = Arc::new(AtomicBool::new(false));
        slot.active = Some(Active {
            request_id: request_id.to_string(),
            cancel: cancel.clone(),
            discarded: discarded.clone(),
        });
        slot.running += 1;
        Ok(SlotLease {
            inner: self.clone(),
            cancel,
            discarded,
            released: false,
        })
    }

    /// Runs, settles and delivers one transaction. The slot is released
    /// before delivery so a caller reacting to the result is never busy.
    async fn execute(
        &self,
        lease: &mut SlotLease,
        request_id: &str,
        request: SaveRequest,
    ) -> (Result<SaveOutcome, SaveError>, bool) {
        let _ = self.events_tx.send(SaveEvent::Started {
            request_id: request_id.to_string(),
        });
        info!(request_id, filename = %request.filename, "save started");

        let mut tx = Transaction::new(request_id, request.filename.clone());
        let pipeline = SavePipeline::new(
            self.platform.as_ref(),
            &self.config,
            self.surface.as_ref(),
            &self.events_tx,
            &lease.cancel,
        );
        let result = match pipeline.run(&mut tx, request).await {
            Err(SaveError::Interrupted) if self.shutdown.is_cancelled() => Err(SaveError::ShutDown),
            other => other,
        };

        let result = self.guard.settle(tx, result);
        let deliver = lease.release();
        if deliver {
            self.guard.deliver(request_id, &result);
        }
        (result, deliver)
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.lock_slot().running == 0 {
                return;
            }
            notified.await;
        }
    }
}
