//! Desktop platform adapter backed by native file dialogs.

use std::path::PathBuf;

use saveas_flow::local;
use saveas_flow::{
    Container, DestinationHandle, PickedFile, PickerRequest, Platform, PlatformError,
    PlatformFuture, ProgressSurface, Sink, Strategy, SurfaceError,
};
use saveas_protocol::mime;

/// Folder and save dialogs via `rfd`.
///
/// Dialogs are awaited through [`rfd::AsyncFileDialog`], so no runtime
/// thread is parked on them and an abandoned request drops its pending
/// dialog future. Folder access on the desktop does not need a persisted
/// grant.
pub struct DialogPlatform {
    strategy: Strategy,
    default_dir: Option<PathBuf>,
}

impl DialogPlatform {
    pub fn new(strategy: Strategy, default_dir: Option<PathBuf>) -> Self {
        Self {
            strategy,
            default_dir,
        }
    }

    fn dialog(&self, title: &str) -> rfd::AsyncFileDialog {
        let dialog = rfd::AsyncFileDialog::new().set_title(title);
        match &self.default_dir {
            Some(dir) => dialog.set_directory(dir),
            None => dialog,
        }
    }
}

impl Platform for DialogPlatform {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn choose_container<'a>(
        &'a self,
        suggested_name: &'a str,
    ) -> PlatformFuture<'a, Option<Container>> {
        Box::pin(async move {
            let pick = self
                .dialog(&format!("Choose a folder for {suggested_name}"))
                .pick_folder();
            let picked = pick.await;
            Ok(picked.map(|dir| local::container_for_dir(dir.path())))
        })
    }

    fn persist_grant<'a>(&'a self, _container: &'a Container) -> PlatformFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn enumerate_entries<'a>(
        &'a self,
        container: &'a Container,
    ) -> PlatformFuture<'a, Vec<String>> {
        let container = container.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || local::list_entries(&container))
                .await
                .map_err(|e| PlatformError::Other(format!("listing task failed: {e}")))?
        })
    }

    fn create_entry<'a>(
        &'a self,
        container: &'a Container,
        name: &'a str,
        _mime_type: &'a str,
    ) -> PlatformFuture<'a, DestinationHandle> {
        Box::pin(async move { local::create_entry(container, name) })
    }

    fn choose_picker_file<'a>(
        &'a self,
        request: PickerRequest<'a>,
    ) -> PlatformFuture<'a, Option<PickedFile>> {
        Box::pin(async move {
            let mut save = self
                .dialog("Save as")
                .set_file_name(request.suggested_name);
            if let Some(ext) = mime::extension_for_mime(request.mime_type) {
                save = save.add_filter(ext.to_uppercase(), &[ext]);
            }
            let pick = save.save_file();
            let picked = pick.await;
            Ok(picked.map(|file| PickedFile {
                handle: local::handle_for_path(file.path()),
                consumed_scratch: false,
            }))
        })
    }

    fn open_sink<'a>(&'a self, handle: &'a DestinationHandle) -> PlatformFuture<'a, Sink> {
        Box::pin(local::open_sink(handle))
    }
}

/// Reports progress to the log; the headless host has no other surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl ProgressSurface for LogSurface {
    fn begin(&self, label: &str) -> Result<(), SurfaceError> {
        tracing::info!(label, "transfer started");
        Ok(())
    }

    fn update(&self, percent: u8, label: &str) -> Result<(), SurfaceError> {
        tracing::debug!(label, percent, "transfer progress");
        Ok(())
    }

    fn end(&self) -> Result<(), SurfaceError> {
        tracing::info!("transfer finished");
        Ok(())
    }
}
