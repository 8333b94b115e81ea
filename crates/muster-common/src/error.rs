//! Error types for muster
//!
//! This module defines:
//! - `MusterError`: Application-specific error enum
//! - `AppError`: Wrapper for integration with calling frameworks

use std::fmt::{Display, Formatter};

/// Application-specific error types
///
/// Service functions return `anyhow::Result`; callers that need to branch
/// on the error kind downcast to this enum.
#[derive(thiserror::Error, Debug)]
pub enum MusterError {
    /// Malformed dispatch/ACL rules or an unknown backend reference.
    /// Fatal at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed for '{0}': {1}")]
    Authentication(String, String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed input to an entity operation
    #[error("bad value: {0}")]
    BadValue(String),

    /// A parent-entity reference is missing
    #[error("referenced {entity} '{reference}' does not exist")]
    ReferentialIntegrity { entity: String, reference: String },

    /// A related row needed to complete a derived computation is absent
    #[error("missing data: {0}")]
    MissingData(String),

    /// Deletion refused because a license assignment still references the row
    #[error("license in use: {0}")]
    LicenseInUse(String),

    /// Transient storage-collaborator failure, passed through unchanged
    #[error("temporary error: {0}")]
    Temporary(String),
}

impl MusterError {
    pub fn bad_value(message: impl Into<String>) -> Self {
        MusterError::BadValue(message.into())
    }

    pub fn missing_data(message: impl Into<String>) -> Self {
        MusterError::MissingData(message.into())
    }

    pub fn referential_integrity(
        entity: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        MusterError::ReferentialIntegrity {
            entity: entity.into(),
            reference: reference.into(),
        }
    }
}

/// Wrapper for application errors
///
/// Cannot implement foreign response traits for `anyhow::Error` directly,
/// so outer layers wrap it once and downcast where they need the kind.
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}
