//! Unified error type for the metering engine and its collaborators.
//!
//! `AppError` is returned by the tenant store, the container runtime and the
//! configuration loader. It serializes as `{ "kind": "...", "message": "..." }`
//! so pass reports can list skipped tenants with a machine-readable reason.

use serde::ser::SerializeStruct;

/// Application-level error.
///
/// `Configuration` and `TenantQuery` are fatal for a pass; every other variant
/// is scoped to a single tenant and only causes that tenant to be skipped.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, unreadable or invalid configuration file.
    #[error("{0}")]
    Configuration(String),

    /// The tenant set for a pass could not be loaded.
    #[error("{0}")]
    TenantQuery(String),

    /// The container runtime could not be reached or did not answer in time.
    #[error("{0}")]
    RuntimeUnavailable(String),

    /// The container exists but has no running process to sample.
    #[error("container {0} is not running")]
    ContainerNotRunning(String),

    /// The runtime does not know the requested service id.
    #[error("unknown service: {0}")]
    UnknownService(String),

    /// A tenant row could not be written.
    #[error("{0}")]
    Persistence(String),

    /// The tenant row changed between read and write.
    #[error("tenant {tenant_id} was modified concurrently")]
    Conflict { tenant_id: i64 },
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "Configuration",
            AppError::TenantQuery(_) => "TenantQuery",
            AppError::RuntimeUnavailable(_) => "RuntimeUnavailable",
            AppError::ContainerNotRunning(_) => "ContainerNotRunning",
            AppError::UnknownService(_) => "UnknownService",
            AppError::Persistence(_) => "Persistence",
            AppError::Conflict { .. } => "Conflict",
        }
    }

    /// Fatal errors abort the whole invocation instead of skipping one tenant.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::Configuration(_) | AppError::TenantQuery(_) => true,
            AppError::RuntimeUnavailable(_)
            | AppError::ContainerNotRunning(_)
            | AppError::UnknownService(_)
            | AppError::Persistence(_)
            | AppError::Conflict { .. } => false,
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

// ---- From implementations for ergonomic error conversion ----

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Configuration(err.to_string())
    }
}
