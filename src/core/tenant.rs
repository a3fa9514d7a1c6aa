//! Tenant record as seen by the metering engine.

use chrono::{DateTime, Utc};

/// Lifecycle state of a tenant's container.
///
/// Persisted as an integer code. The legacy terminated code is never selected
/// by any pass, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub const ACTIVE_CODE: i64 = 1;
    pub const SUSPENDED_CODE: i64 = 2;
    /// Written by an older provisioning flow; inert for this engine.
    pub const LEGACY_TERMINATED_CODE: i64 = 3;

    pub fn code(self) -> i64 {
        match self {
            TenantStatus::Active => Self::ACTIVE_CODE,
            TenantStatus::Suspended => Self::SUSPENDED_CODE,
        }
    }
}

impl TryFrom<i64> for TenantStatus {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            Self::ACTIVE_CODE => Ok(TenantStatus::Active),
            Self::SUSPENDED_CODE => Ok(TenantStatus::Suspended),
            other => Err(other),
        }
    }
}

/// Last observed raw counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSample {
    pub result: u64,
    pub time: DateTime<Utc>,
}

/// A billed tenant with an optional backing container.
#[derive(Debug, Clone, PartialEq)]
pub struct Tenant {
    pub id: i64,
    pub username: String,
    /// Empty when no container has been provisioned.
    pub service_id: String,
    pub status: TenantStatus,
    /// Quota in whole gigabytes.
    pub package_limit: i64,
    /// Gigabytes consumed in the current billing cycle.
    pub package_used: f64,
    pub last_stats_result: u64,
    pub last_stats_time: Option<DateTime<Utc>>,
    /// End of the current subscription period.
    pub expired: DateTime<Utc>,
    /// Row revision observed when the tenant was read; guards conditional updates.
    pub revision: i64,
}

impl Tenant {
    /// The previous sample, if the container has ever been sampled.
    pub fn last_sample(&self) -> Option<StatsSample> {
        self.last_stats_time.map(|time| StatsSample {
            result: self.last_stats_result,
            time,
        })
    }

    /// Record a new baseline; result and time always move together.
    pub fn record_sample(&mut self, sample: StatsSample) {
        self.last_stats_result = sample.result;
        self.last_stats_time = Some(sample.time);
    }

    /// Usage pinned to exactly the quota.
    pub fn clamp_usage_to_limit(&mut self) {
        self.package_used = self.package_limit as f64;
    }
}

/// Columns a pass may write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantField {
    PackageUsed,
    LastStatsResult,
    LastStatsTime,
    Status,
}

impl TenantField {
    pub fn column(self) -> &'static str {
        match self {
            TenantField::PackageUsed => "package_used",
            TenantField::LastStatsResult => "last_stats_result",
            TenantField::LastStatsTime => "last_stats_time",
            TenantField::Status => "status",
        }
    }
}

/// Selection predicate: tenants with a container and the given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantFilter {
    pub status: TenantStatus,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_try_from() {
        for status in [TenantStatus::Active, TenantStatus::Suspended] {
            assert_eq!(TenantStatus::try_from(status.code()), Ok(status));
        }
    }

    #[test]
    fn test_legacy_and_unknown_codes_are_rejected() {
        assert_eq!(
            TenantStatus::try_from(TenantStatus::LEGACY_TERMINATED_CODE),
            Err(3)
        );
        assert_eq!(TenantStatus::try_from(0), Err(0));
    }

    #[test]
    fn test_last_sample_requires_a_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut tenant = Tenant {
            id: 1,
            username: "alice".into(),
            service_id: "abc".into(),
            status: TenantStatus::Active,
            package_limit: 10,
            package_used: 0.0,
            last_stats_result: 42,
            last_stats_time: None,
            expired: t0,
            revision: 0,
        };
        assert_eq!(tenant.last_sample(), None);

        tenant.record_sample(StatsSample { result: 99, time: t0 });
        assert_eq!(tenant.last_sample(), Some(StatsSample { result: 99, time: t0 }));
    }
}
