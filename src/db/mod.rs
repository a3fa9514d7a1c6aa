//! SQLite persistence layer for tenant records.
//!
//! Uses `rusqlite` with bundled SQLite. The connection is opened once at
//! process start and handed to the reconciler; every pass reads and writes
//! through it.

mod tenants;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

use crate::core::tenant::{Tenant, TenantField, TenantFilter};
use crate::error::AppError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tenants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        service_id TEXT NOT NULL DEFAULT '',
        status INTEGER NOT NULL DEFAULT 1,
        package_limit INTEGER NOT NULL DEFAULT 0,
        package_used REAL NOT NULL DEFAULT 0.0,
        last_stats_result INTEGER NOT NULL DEFAULT 0,
        last_stats_time TEXT,
        expired TEXT NOT NULL,
        revision INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_tenants_status ON tenants(status);
";

/// Read and conditional-write access to tenant rows.
pub trait TenantStore {
    /// Tenants with a provisioned container and the filter's status.
    fn list_tenants(&self, filter: TenantFilter) -> Result<Vec<Tenant>, AppError>;

    /// Write back `fields` only if the row is unchanged since it was read.
    /// A concurrent modification yields [`AppError::Conflict`].
    fn persist_tenant(&self, tenant: &Tenant, fields: &[TenantField]) -> Result<(), AppError>;
}

/// Owns the SQLite connection holding the tenant table.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, AppError> {
        let conn = Connection::open(path).map_err(|e| {
            AppError::Configuration(format!("cannot open database {}: {e}", path.display()))
        })?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;

        // WAL lets a reporting reader coexist with a running pass.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Persistence("database connection mutex poisoned".into()))
    }
}
