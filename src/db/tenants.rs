//! Tenant table queries and conditional updates.

use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, ToSql};

use super::{Database, TenantStore};
use crate::core::tenant::{Tenant, TenantField, TenantFilter, TenantStatus};
use crate::error::AppError;

pub(super) const COLUMNS: &str = "id, username, service_id, status, package_limit, package_used, \
     last_stats_result, last_stats_time, expired, revision";

impl TenantStore for Database {
    fn list_tenants(&self, filter: TenantFilter) -> Result<Vec<Tenant>, AppError> {
        let query_err = |e: rusqlite::Error| AppError::TenantQuery(e.to_string());

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(&format!(
                "SELECT {COLUMNS} FROM tenants
                 WHERE service_id != '' AND status = ?1
                 ORDER BY id ASC"
            ))
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![filter.status.code()], map_tenant_row)
            .map_err(query_err)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(query_err)?);
        }
        Ok(results)
    }

    fn persist_tenant(&self, tenant: &Tenant, fields: &[TenantField]) -> Result<(), AppError> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut assignments = Vec::with_capacity(fields.len() + 1);
        let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(fields.len() + 2);
        for field in fields {
            values.push(field_value(tenant, *field));
            assignments.push(format!("{} = ?{}", field.column(), values.len()));
        }
        assignments.push("revision = revision + 1".to_string());

        let sql = format!(
            "UPDATE tenants SET {} WHERE id = ?{} AND revision = ?{}",
            assignments.join(", "),
            values.len() + 1,
            values.len() + 2,
        );
        values.push(Box::new(tenant.id));
        values.push(Box::new(tenant.revision));

        let conn = self.lock()?;
        let changed = conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(AppError::Conflict {
                tenant_id: tenant.id,
            });
        }
        Ok(())
    }
}

fn field_value(tenant: &Tenant, field: TenantField) -> Box<dyn ToSql> {
    match field {
        TenantField::PackageUsed => Box::new(tenant.package_used),
        TenantField::LastStatsResult => Box::new(tenant.last_stats_result),
        TenantField::LastStatsTime => Box::new(tenant.last_stats_time),
        TenantField::Status => Box::new(tenant.status.code()),
    }
}

pub(super) fn map_tenant_row(row: &rusqlite::Row) -> rusqlite::Result<Tenant> {
    let code: i64 = row.get(3)?;
    let status = TenantStatus::try_from(code).map_err(|code| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Integer,
            format!("unknown tenant status code {code}").into(),
        )
    })?;

    Ok(Tenant {
        id: row.get(0)?,
        username: row.get(1)?,
        service_id: row.get(2)?,
        status,
        package_limit: row.get(4)?,
        package_used: row.get(5)?,
        last_stats_result: row.get(6)?,
        last_stats_time: row.get(7)?,
        expired: row.get(8)?,
        revision: row.get(9)?,
    })
}
