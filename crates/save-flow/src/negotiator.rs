//! Destination negotiation: chooser, grant, naming, entry creation.

use std::collections::HashSet;
use std::path::Path;

use saveas_file_ops::resolve_free_name;
use tracing::{debug, warn};

use crate::error::SaveError;
use crate::platform::{
    Container, DestinationHandle, PickedFile, PickerRequest, Platform, PlatformError, Strategy,
};
use crate::types::SaveConfig;

/// Where a negotiation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    AwaitingContainerChoice,
    AwaitingPermission,
    /// Waiting on the direct picker (first choice or fallback).
    AwaitingFileChoice,
    Ready,
    Cancelled,
    Failed,
}

/// A destination ready for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub destination: DestinationHandle,
    /// The platform already moved the scratch bytes into place.
    pub consumed_scratch: bool,
    /// Collision-free name we asked the platform for.
    pub resolved_name: String,
}

/// Drives the platform choosers for one transaction.
pub struct Negotiator<'a> {
    platform: &'a dyn Platform,
    max_name_attempts: u32,
    require_persisted_grant: bool,
    state: NegotiationState,
    choosers_presented: u32,
}

impl<'a> Negotiator<'a> {
    pub fn new(platform: &'a dyn Platform, config: &SaveConfig) -> Self {
        Self {
            platform,
            max_name_attempts: config.max_name_attempts,
            require_persisted_grant: config.require_persisted_grant,
            state: NegotiationState::Idle,
            choosers_presented: 0,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Choosers shown so far; a fallback picker counts as a second one.
    pub fn choosers_presented(&self) -> u32 {
        self.choosers_presented
    }

    /// Obtains a writable destination for `desired_name`.
    ///
    /// With [`Strategy::ContainerFirst`] the user picks a folder, the name is
    /// de-duplicated against its entries and the entry is created there.
    /// If the folder chooser is unavailable or the provider rejects entry
    /// creation, the direct picker is shown instead, seeded with the
    /// resolved name.
    pub async fn negotiate(
        &mut self,
        desired_name: &str,
        mime_type: &str,
        scratch: &Path,
    ) -> Result<Negotiated, SaveError> {
        self.state = NegotiationState::Idle;

        if self.platform.strategy() == Strategy::PickerOnly {
            return self.pick(desired_name, mime_type, scratch).await;
        }

        self.state = NegotiationState::AwaitingContainerChoice;
        self.choosers_presented += 1;
        let container = match self.platform.choose_container(desired_name).await {
            Ok(Some(container)) => container,
            Ok(None) => return Err(self.cancelled()),
            Err(PlatformError::Unavailable(reason)) => {
                warn!(reason = %reason, "folder chooser unavailable, using picker");
                return self.pick(desired_name, mime_type, scratch).await;
            }
            Err(e) => return Err(self.failed(e.into())),
        };
        debug!(container = %container.label, "container chosen");

        self.state = NegotiationState::AwaitingPermission;
        if let Err(e) = self.platform.persist_grant(&container).await {
            if self.require_persisted_grant {
                return Err(self.failed(SaveError::PermissionDenied(e.to_string())));
            }
            warn!(container = %container.label, error = %e, "could not persist folder grant");
        }

        let resolved = self.resolve_in(&container, desired_name).await;
        match self
            .platform
            .create_entry(&container, &resolved, mime_type)
            .await
        {
            Ok(destination) => {
                self.state = NegotiationState::Ready;
                debug!(name = %resolved, uri = %destination.uri, "entry created");
                Ok(Negotiated {
                    destination,
                    consumed_scratch: false,
                    resolved_name: resolved,
                })
            }
            Err(PlatformError::Rejected(reason) | PlatformError::Unavailable(reason)) => {
                warn!(reason = %reason, name = %resolved, "entry creation refused, using picker");
                self.pick(&resolved, mime_type, scratch).await
            }
            Err(e) => Err(self.failed(e.into())),
        }
    }

    async fn resolve_in(&self, container: &Container, desired_name: &str) -> String {
        let existing: HashSet<String> = match self.platform.enumerate_entries(container).await {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                warn!(container = %container.label, error = %e, "could not list folder entries");
                HashSet::new()
            }
        };
        resolve_free_name(
            desired_name,
            |candidate| existing.contains(candidate),
            self.max_name_attempts,
        )
    }

    async fn pick(
        &mut self,
        name: &str,
        mime_type: &str,
        scratch: &Path,
    ) -> Result<Negotiated, SaveError> {
        self.state = NegotiationState::AwaitingFileChoice;
        self.choosers_presented += 1;
        let request = PickerRequest {
            suggested_name: name,
            mime_type,
            scratch,
        };
        match self.platform.choose_picker_file(request).await {
            Ok(Some(PickedFile {
                handle,
                consumed_scratch,
            })) => {
                self.state = NegotiationState::Ready;
                debug!(uri = %handle.uri, consumed_scratch, "file picked");
                Ok(Negotiated {
                    destination: handle,
                    consumed_scratch,
                    resolved_name: name.to_string(),
                })
            }
            Ok(None) => Err(self.cancelled()),
            Err(e) => Err(self.failed(e.into())),
        }
    }

    fn cancelled(&mut self) -> SaveError {
        self.state = NegotiationState::Cancelled;
        SaveError::UserCancelled
    }

    fn failed(&mut self, err: SaveError) -> SaveError {
        self.state = NegotiationState::Failed;
        err
    }
}
