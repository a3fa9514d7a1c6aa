//! Lifecycle reconciler: one pass over the eligible tenants in a given mode.
//!
//! | mode    | selects              | transition                                   |
//! |---------|----------------------|----------------------------------------------|
//! | instant | container + active    | sample usage, suspend when over quota        |
//! | daily   | container + active    | suspend when the subscription has expired    |
//! | monthly | container + suspended | reactivate with zero usage if still subscribed |
//!
//! Tenants are processed sequentially and independently. A failing tenant is
//! logged and skipped; only a failure to load the tenant set aborts the pass.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::short_id;
use crate::core::delta::{compute_delta, DeltaKind};
use crate::core::quota::{self, Enforcement};
use crate::core::tenant::{StatsSample, Tenant, TenantField, TenantFilter, TenantStatus};
use crate::db::TenantStore;
use crate::error::AppError;
use crate::runtime::ContainerRuntime;

/// Columns written when a tenant is taken out of service or put back.
const STATUS_FIELDS: &[TenantField] = &[TenantField::PackageUsed, TenantField::Status];

/// Which sweep an invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Frequent usage sampling and quota enforcement.
    #[default]
    Instant,
    /// Subscription expiration sweep.
    Daily,
    /// Billing cycle reset for tenants suspended on quota.
    Monthly,
}

impl Mode {
    /// Selection predicate for this mode.
    pub fn filter(self) -> TenantFilter {
        let status = match self {
            Mode::Instant | Mode::Daily => TenantStatus::Active,
            Mode::Monthly => TenantStatus::Suspended,
        };
        TenantFilter { status }
    }

    /// Columns this mode writes back.
    pub fn persisted_fields(self) -> &'static [TenantField] {
        match self {
            Mode::Instant => &[
                TenantField::PackageUsed,
                TenantField::LastStatsResult,
                TenantField::LastStatsTime,
                TenantField::Status,
            ],
            Mode::Daily | Mode::Monthly => STATUS_FIELDS,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Instant => "instant",
            Mode::Daily => "daily",
            Mode::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// What happened to one tenant in a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Sampled { bandwidth_gb: f64 },
    Suspended { bandwidth_gb: f64 },
    Expired,
    Reactivated,
    /// Selected but no transition applied.
    Unchanged,
}

/// A tenant skipped because of a collaborator failure.
#[derive(Debug, Serialize)]
pub struct SkippedTenant {
    pub tenant_id: i64,
    pub error: AppError,
}

/// Summary of one pass.
#[derive(Debug, Serialize)]
pub struct PassReport {
    pub mode: Mode,
    pub selected: usize,
    pub sampled: usize,
    pub suspended: usize,
    pub expired: usize,
    pub reactivated: usize,
    pub unchanged: usize,
    pub skipped: Vec<SkippedTenant>,
}

impl PassReport {
    fn new(mode: Mode, selected: usize) -> Self {
        Self {
            mode,
            selected,
            sampled: 0,
            suspended: 0,
            expired: 0,
            reactivated: 0,
            unchanged: 0,
            skipped: Vec::new(),
        }
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sampled { .. } => self.sampled += 1,
            Outcome::Suspended { .. } => self.suspended += 1,
            Outcome::Expired => self.expired += 1,
            Outcome::Reactivated => self.reactivated += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Drives tenants through the active/suspended lifecycle.
pub struct Reconciler<S, R> {
    store: S,
    runtime: R,
}

impl<S: TenantStore, R: ContainerRuntime> Reconciler<S, R> {
    pub fn new(store: S, runtime: R) -> Self {
        Self { store, runtime }
    }

    /// Run one pass. `now` is the pass timestamp: it decides expiry and is
    /// stored as the sample time of every tenant sampled in this pass.
    pub async fn run(&self, mode: Mode, now: DateTime<Utc>) -> Result<PassReport, AppError> {
        let tenants = self.store.list_tenants(mode.filter()).map_err(|e| match e {
            AppError::TenantQuery(_) => e,
            other => AppError::TenantQuery(other.to_string()),
        })?;

        tracing::info!(%mode, tenants = tenants.len(), "pass started");
        let mut report = PassReport::new(mode, tenants.len());

        for mut tenant in tenants {
            match self.reconcile(mode, &mut tenant, now).await {
                Ok(outcome) => {
                    log_outcome(&tenant, outcome);
                    report.record(outcome);
                }
                Err(error) => {
                    tracing::warn!(
                        tenant_id = tenant.id,
                        username = %tenant.username,
                        container = short_id(&tenant.service_id),
                        reason = %error,
                        kind = error.kind(),
                        "skipped"
                    );
                    report.skipped.push(SkippedTenant {
                        tenant_id: tenant.id,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            %mode,
            selected = report.selected,
            sampled = report.sampled,
            suspended = report.suspended,
            expired = report.expired,
            reactivated = report.reactivated,
            unchanged = report.unchanged,
            skipped = report.skipped.len(),
            "pass finished"
        );
        Ok(report)
    }

    async fn reconcile(
        &self,
        mode: Mode,
        tenant: &mut Tenant,
        now: DateTime<Utc>,
    ) -> Result<Outcome, AppError> {
        match mode {
            Mode::Instant => self.sample(tenant, now).await,
            Mode::Daily => self.expire(tenant, now).await,
            Mode::Monthly => self.reactivate(tenant, now).await,
        }
    }

    /// Meter usage since the last sample and enforce the quota.
    ///
    /// Usage and the new baseline are written before any stop is issued, so a
    /// failed status write after a successful stop leaves the over-quota usage
    /// on the row for the next pass to act on.
    async fn sample(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<Outcome, AppError> {
        match tenant.status {
            TenantStatus::Active => {}
            TenantStatus::Suspended => return Ok(Outcome::Unchanged),
        }

        let counter = self.runtime.egress_counter(&tenant.service_id).await;
        let raw = match counter {
            Ok(raw) => raw,
            Err(AppError::ContainerNotRunning(service_id)) => {
                return self.resume_suspension(tenant, service_id).await
            }
            Err(e) => return Err(e),
        };
        let started_at = self.runtime.started_at(&tenant.service_id).await?;

        let delta = compute_delta(tenant.last_sample(), raw, started_at);
        if delta.kind == DeltaKind::Rebaselined {
            tracing::warn!(
                tenant_id = tenant.id,
                container = short_id(&tenant.service_id),
                previous = tenant.last_stats_result,
                raw,
                "egress counter went backwards without a restart, re-baselining"
            );
        }
        let bandwidth_gb = delta.gigabytes();
        tenant.package_used += bandwidth_gb;
        tenant.record_sample(StatsSample { result: raw, time: now });
        self.persist(tenant, Mode::Instant.persisted_fields())?;

        match quota::enforce(tenant, &self.runtime).await {
            Enforcement::Suspended => {
                self.persist(tenant, STATUS_FIELDS)?;
                Ok(Outcome::Suspended { bandwidth_gb })
            }
            Enforcement::StopFailed(e) => {
                tracing::warn!(
                    tenant_id = tenant.id,
                    container = short_id(&tenant.service_id),
                    reason = %e,
                    "over quota but stop failed, retrying next pass"
                );
                Ok(Outcome::Sampled { bandwidth_gb })
            }
            Enforcement::WithinQuota | Enforcement::AlreadySuspended => {
                Ok(Outcome::Sampled { bandwidth_gb })
            }
        }
    }

    /// An active tenant whose container is already down cannot be sampled.
    ///
    /// The baseline is kept and the quota is checked against the stored usage.
    /// This finishes a suspension whose status write failed after the stop.
    async fn resume_suspension(
        &self,
        tenant: &mut Tenant,
        service_id: String,
    ) -> Result<Outcome, AppError> {
        match quota::enforce(tenant, &self.runtime).await {
            Enforcement::Suspended => {
                self.persist(tenant, STATUS_FIELDS)?;
                Ok(Outcome::Suspended { bandwidth_gb: 0.0 })
            }
            Enforcement::StopFailed(e) => Err(e),
            Enforcement::WithinQuota | Enforcement::AlreadySuspended => {
                Err(AppError::ContainerNotRunning(service_id))
            }
        }
    }

    /// Suspend an active tenant whose subscription ended before `now`.
    async fn expire(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<Outcome, AppError> {
        match tenant.status {
            TenantStatus::Active => {}
            TenantStatus::Suspended => return Ok(Outcome::Unchanged),
        }
        if tenant.expired >= now {
            return Ok(Outcome::Unchanged);
        }

        self.runtime.stop(&tenant.service_id).await?;
        tenant.status = TenantStatus::Suspended;
        tenant.clamp_usage_to_limit();
        self.persist(tenant, Mode::Daily.persisted_fields())?;
        Ok(Outcome::Expired)
    }

    /// Restart a quota-suspended tenant whose subscription is still valid.
    async fn reactivate(&self, tenant: &mut Tenant, now: DateTime<Utc>) -> Result<Outcome, AppError> {
        match tenant.status {
            TenantStatus::Suspended => {}
            TenantStatus::Active => return Ok(Outcome::Unchanged),
        }
        if tenant.expired < now {
            return Ok(Outcome::Unchanged);
        }

        self.runtime.start(&tenant.service_id).await?;
        tenant.status = TenantStatus::Active;
        tenant.package_used = 0.0;
        self.persist(tenant, Mode::Monthly.persisted_fields())?;
        Ok(Outcome::Reactivated)
    }

    /// Conditional write; the in-memory revision follows the row on success.
    fn persist(&self, tenant: &mut Tenant, fields: &[TenantField]) -> Result<(), AppError> {
        self.store.persist_tenant(tenant, fields)?;
        tenant.revision += 1;
        Ok(())
    }
}

fn log_outcome(tenant: &Tenant, outcome: Outcome) {
    let container = short_id(&tenant.service_id);
    match outcome {
        Outcome::Sampled { bandwidth_gb } => tracing::info!(
            tenant_id = tenant.id,
            username = %tenant.username,
            container,
            bandwidth_gb = format_args!("{bandwidth_gb:.2}"),
            package_used = tenant.package_used,
            "sampled"
        ),
        Outcome::Suspended { bandwidth_gb } => tracing::info!(
            tenant_id = tenant.id,
            username = %tenant.username,
            container,
            bandwidth_gb = format_args!("{bandwidth_gb:.2}"),
            package_limit = tenant.package_limit,
            "suspended: quota exhausted"
        ),
        Outcome::Expired => tracing::info!(
            tenant_id = tenant.id,
            username = %tenant.username,
            container,
            "suspended: subscription expired"
        ),
        Outcome::Reactivated => tracing::info!(
            tenant_id = tenant.id,
            username = %tenant.username,
            container,
            "reactivated"
        ),
        Outcome::Unchanged => tracing::debug!(tenant_id = tenant.id, container, "unchanged"),
    }
}
