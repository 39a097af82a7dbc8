//! # StayRate PMS
//!
//! Connectivity to external Property Management Systems: a capability trait
//! with one implementation per backend, a registry resolving integration
//! credentials to adapter instances, and the sync gateway enforcing the
//! remote-first ordering that keeps local and remote state from splitting.
//!
//! ## Core Features
//!
//! - **Adapter Trait**: Connection test, property/reservation listing,
//!   reservation CRUD, settings and rate pushes in a canonical wire format
//! - **Registry**: `PmsKind → adapter` factory lookup, initialized at boot
//! - **Adapters**: Smoobu and Beds24 over `reqwest`, plus a deterministic
//!   mock backend for tests
//! - **Sync Gateway**: remote-then-local for settings/rules/rates (abort on
//!   remote failure), best-effort remote for locally initiated reservations,
//!   local-only upsert for remote-originated reservations

pub mod adapter;
pub mod adapters;
pub mod gateway;
pub mod registry;

pub use adapter::*;
pub use adapters::mock::MockAdapter;
pub use gateway::*;
pub use registry::*;

use stayrate_core::PmsKind;
use thiserror::Error;

/// Errors surfaced by PMS adapters and the gateway.
#[derive(Error, Debug)]
pub enum PmsError {
    /// Credentials rejected by the backend.
    #[error("{backend} authentication failed: {reason}")]
    Auth { backend: &'static str, reason: String },

    /// Transport or backend failure; the reason is preserved for the caller.
    #[error("{backend} request failed: {reason}")]
    Request { backend: &'static str, reason: String },

    /// The backend answered with something the adapter cannot normalize.
    #[error("{backend} returned an unexpected payload: {reason}")]
    Payload { backend: &'static str, reason: String },

    /// No adapter registered for the requested kind.
    #[error("no adapter registered for pms kind {0}")]
    UnknownKind(PmsKind),

    /// The user has no integration row for the property's backend.
    #[error("no {kind} integration connected")]
    NotConnected { kind: PmsKind },

    /// Credential payload is missing a required field.
    #[error("invalid {backend} credentials: {reason}")]
    Credentials { backend: &'static str, reason: String },
}

impl PmsError {
    pub(crate) fn request(backend: &'static str, reason: impl Into<String>) -> Self {
        PmsError::Request {
            backend,
            reason: reason.into(),
        }
    }

    pub(crate) fn payload(backend: &'static str, reason: impl Into<String>) -> Self {
        PmsError::Payload {
            backend,
            reason: reason.into(),
        }
    }

    /// Backend name for provider-error reporting.
    pub fn backend(&self) -> &str {
        match self {
            PmsError::Auth { backend, .. }
            | PmsError::Request { backend, .. }
            | PmsError::Payload { backend, .. }
            | PmsError::Credentials { backend, .. } => backend,
            PmsError::UnknownKind(kind) => kind.as_str(),
            PmsError::NotConnected { kind } => kind.as_str(),
        }
    }
}

/// Result alias for PMS operations.
pub type PmsResult<T> = Result<T, PmsError>;
