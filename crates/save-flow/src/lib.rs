//! One Save As transaction, end to end.
//!
//! This crate holds the **core pipeline** for handing an in-memory payload
//! to the host OS save flow. It has no UI dependencies: the host provides a
//! [`Platform`] implementation that drives the native choosers.
//!
//! # Pipeline
//!
//! 1. **Stage**: decode the payload into a private scratch file
//! 2. **Negotiate**: pick a container (or file), resolve a free name,
//!    create the destination entry
//! 3. **Transfer**: stream scratch bytes to the destination with progress
//! 4. **Settle**: delete the scratch file and deliver exactly one result

pub mod error;
pub mod guard;
pub mod local;
pub mod negotiator;
pub mod pipeline;
pub mod platform;
pub mod service;
pub mod surface;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::SaveError;
pub use guard::LifecycleGuard;
pub use negotiator::{Negotiated, NegotiationState, Negotiator};
pub use pipeline::SavePipeline;
pub use platform::{
    Container, DestinationHandle, PickedFile, PickerRequest, Platform, PlatformError,
    PlatformFuture, Sink, Strategy,
};
pub use service::{PendingSave, SaveService};
pub use surface::{NoSurface, ProgressSurface, SurfaceError};
pub use transaction::{Transaction, TransactionState};
pub use types::{SaveConfig, SaveEvent, SaveOutcome};
