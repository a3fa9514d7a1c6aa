//! Quota enforcement: the only place that issues a container stop for usage.

use crate::core::tenant::{Tenant, TenantStatus};
use crate::error::AppError;
use crate::runtime::ContainerRuntime;

/// Outcome of evaluating a tenant against its quota.
#[derive(Debug)]
pub enum Enforcement {
    /// Whole gigabytes used are still below the limit.
    WithinQuota,
    /// Already out of service; nothing was issued.
    AlreadySuspended,
    /// Container stopped, usage clamped to the limit, status flipped.
    Suspended,
    /// Stop request failed. Status stays active and usage is kept as is,
    /// so the next pass retries.
    StopFailed(AppError),
}

/// True once accumulated whole gigabytes reach the limit.
pub fn is_over_quota(package_used: f64, package_limit: i64) -> bool {
    package_used.trunc() as i64 >= package_limit
}

/// Suspend `tenant` if it has exhausted its quota.
pub async fn enforce<R: ContainerRuntime>(tenant: &mut Tenant, runtime: &R) -> Enforcement {
    match tenant.status {
        TenantStatus::Suspended => return Enforcement::AlreadySuspended,
        TenantStatus::Active => {}
    }

    if !is_over_quota(tenant.package_used, tenant.package_limit) {
        return Enforcement::WithinQuota;
    }

    match runtime.stop(&tenant.service_id).await {
        Ok(()) => {
            tenant.clamp_usage_to_limit();
            tenant.status = TenantStatus::Suspended;
            Enforcement::Suspended
        }
        Err(e) => Enforcement::StopFailed(e),
    }
}
