//! Container runtime backends.
//!
//! The engine only needs four calls from the runtime: the cumulative egress
//! counter, the current container start time, and stop/start. Backends:
//! - Docker CLI + procfs (`docker_backend`)

pub mod docker_backend;
pub mod net_dev;

use chrono::{DateTime, Utc};

use crate::error::AppError;

pub use docker_backend::DockerRuntime;

/// Process control and counter queries against the container runtime.
///
/// Failures are `RuntimeUnavailable` or `UnknownService`. `egress_counter`
/// returns `ContainerNotRunning` for a container without a live process.
/// `stop` and `start` must succeed when the container is already in the
/// requested state.
pub trait ContainerRuntime {
    /// Cumulative transmitted bytes since the container process started.
    async fn egress_counter(&self, service_id: &str) -> Result<u64, AppError>;

    /// When the current container process started.
    async fn started_at(&self, service_id: &str) -> Result<DateTime<Utc>, AppError>;

    async fn stop(&self, service_id: &str) -> Result<(), AppError>;

    async fn start(&self, service_id: &str) -> Result<(), AppError>;
}
