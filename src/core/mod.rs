//! Core logic: usage metering, quota enforcement, lifecycle passes.
//!
//! - [`delta`]: bandwidth since the previous sample, restart aware
//! - [`quota`]: whole-gigabyte quota check and suspension
//! - [`reconciler`]: [`Reconciler`] running instant/daily/monthly passes
//! - [`tenant`]: the tenant record and its status enum

pub mod delta;
pub mod quota;
pub mod reconciler;
pub mod tenant;

pub use delta::{compute_delta, Delta, DeltaKind};
pub use quota::{enforce, is_over_quota, Enforcement};
pub use reconciler::{Mode, Outcome, PassReport, Reconciler, SkippedTenant};
pub use tenant::{StatsSample, Tenant, TenantField, TenantFilter, TenantStatus};
