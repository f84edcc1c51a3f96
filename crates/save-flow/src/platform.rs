//! Platform capability trait.
//!
//! The host implements [`Platform`] on top of its native choosers and
//! storage providers. The core pipeline only talks to this trait, which
//! keeps it free of UI code and testable with mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

/// Boxed future returned by every [`Platform`] method.
pub type PlatformFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PlatformError>> + Send + 'a>>;

/// Writable destination stream handed to the transfer engine.
pub type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// How a platform prefers to obtain a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Choose a folder, then create the entry inside it.
    #[default]
    ContainerFirst,
    /// Go straight to a "create document" picker.
    PickerOnly,
}

/// A user-chosen folder (or provider tree) that entries can be created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub uri: String,
    /// Human-readable name, for logging only.
    pub label: String,
}

/// Opaque reference to a writable destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationHandle {
    pub uri: String,
    /// Final on-disk name; may differ from the requested one.
    pub display_name: String,
}

/// Arguments for the direct picker.
#[derive(Debug, Clone, Copy)]
pub struct PickerRequest<'a> {
    /// Already de-duplicated name to seed the picker with.
    pub suggested_name: &'a str,
    pub mime_type: &'a str,
    /// Staged bytes, for platforms whose picker takes the file itself.
    pub scratch: &'a Path,
}

/// Result of the direct picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub handle: DestinationHandle,
    /// Set when the picker moved the scratch file into place, so no
    /// transfer is needed.
    pub consumed_scratch: bool,
}

/// Failures reported by platform primitives.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The primitive does not exist on this platform or provider.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the operation (e.g. entry creation in a tree).
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Capabilities the save pipeline needs from the host.
///
/// Chooser methods resolve to `Ok(None)` when the user dismisses them.
pub trait Platform: Send + Sync {
    /// Preferred destination strategy.
    fn strategy(&self) -> Strategy;

    /// Presents a folder chooser.
    fn choose_container<'a>(
        &'a self,
        suggested_name: &'a str,
    ) -> PlatformFuture<'a, Option<Container>>;

    /// Persists long-lived access to `container`.
    fn persist_grant<'a>(&'a self, container: &'a Container) -> PlatformFuture<'a, ()>;

    /// Lists the names of existing entries in `container`.
    fn enumerate_entries<'a>(&'a self, container: &'a Container)
    -> PlatformFuture<'a, Vec<String>>;

    /// Creates a new, empty entry called `name` inside `container`.
    fn create_entry<'a>(
        &'a self,
        container: &'a Container,
        name: &'a str,
        mime_type: &'a str,
    ) -> PlatformFuture<'a, DestinationHandle>;

    /// Presents a "create document" picker.
    fn choose_picker_file<'a>(
        &'a self,
        request: PickerRequest<'a>,
    ) -> PlatformFuture<'a, Option<PickedFile>>;

    /// Opens a write stream on `handle`.
    fn open_sink<'a>(&'a self, handle: &'a DestinationHandle) -> PlatformFuture<'a, Sink>;
}
