//! libSQL backend.
//!
//! Opens a fresh connection per operation; the underlying `libsql::Database`
//! handle is shared and cheap to clone via `Arc`.

mod claims;
mod clients;
mod orders;
mod products;
mod users;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Value, params};

use crate::db::Database;
use crate::db::libsql_migrations::{MIGRATION_TABLE_DDL, MIGRATIONS};
use crate::error::DatabaseError;

/// libSQL-backed implementation of [`Database`].
#[derive(Clone)]
pub struct LibSqlBackend {
    db: Arc<libsql::Database>,
}

impl LibSqlBackend {
    /// Open (or create) a database file on local disk.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        ensure_parent_dir(path)?;
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;
        tracing::info!(path = %path.display(), "Opened local libSQL database");
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an embedded replica of a remote libSQL/Turso database.
    ///
    /// Reads are served from the local file; writes go to the primary.
    pub async fn new_remote_replica(
        path: &Path,
        url: &str,
        auth_token: &str,
    ) -> Result<Self, DatabaseError> {
        ensure_parent_dir(path)?;
        let db = libsql::Builder::new_remote_replica(path, url.to_string(), auth_token.to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;
        db.sync()
            .await
            .map_err(|e| DatabaseError::Pool(format!("initial replica sync failed: {e}")))?;
        tracing::info!(path = %path.display(), url, "Opened libSQL embedded replica");
        Ok(Self { db: Arc::new(db) })
    }

    pub async fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db
            .connect()
            .map_err(|e| DatabaseError::Pool(e.to_string()))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::Pool(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }
    Ok(())
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute_batch(MIGRATION_TABLE_DDL)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        for migration in MIGRATIONS {
            let applied = conn
                .query(
                    "SELECT version FROM _migrations WHERE version = ?1",
                    params![migration.version],
                )
                .await?
                .next()
                .await?
                .is_some();
            if applied {
                continue;
            }

            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!("{} (v{}): {}", migration.name, migration.version, e))
            })?;
            conn.execute(
                "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )
            .await?;
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applied schema migration"
            );
        }
        Ok(())
    }
}

// ==================== Row helpers ====================

pub(crate) fn get_text(row: &libsql::Row, idx: i32) -> String {
    match row.get_value(idx) {
        Ok(Value::Text(s)) => s,
        _ => String::new(),
    }
}

pub(crate) fn get_i64(row: &libsql::Row, idx: i32) -> i64 {
    match row.get_value(idx) {
        Ok(Value::Integer(v)) => v,
        Ok(Value::Real(v)) => v as i64,
        _ => 0,
    }
}

pub(crate) fn get_opt_i64(row: &libsql::Row, idx: i32) -> Option<i64> {
    match row.get_value(idx) {
        Ok(Value::Integer(v)) => Some(v),
        Ok(Value::Real(v)) => Some(v as i64),
        _ => None,
    }
}

pub(crate) fn get_f64(row: &libsql::Row, idx: i32) -> f64 {
    match row.get_value(idx) {
        Ok(Value::Real(v)) => v,
        Ok(Value::Integer(v)) => v as f64,
        _ => 0.0,
    }
}

pub(crate) fn get_bool(row: &libsql::Row, idx: i32) -> bool {
    get_i64(row, idx) != 0
}

pub(crate) fn opt_i64(value: Option<i64>) -> Value {
    value.map(Value::Integer).unwrap_or(Value::Null)
}

pub(crate) fn bool_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

pub(crate) fn parse_uuid(raw: &str, field: &str) -> Result<uuid::Uuid, DatabaseError> {
    uuid::Uuid::parse_str(raw)
        .map_err(|e| DatabaseError::Serialization(format!("invalid {} uuid: {}", field, e)))
}

/// Resolve a lookup that is expected to hit at most one row.
///
/// Zero rows and more than one row both come back as `None`; the second case
/// is logged because it means the index is carrying duplicates.
pub(crate) fn unique_match<T>(mut matches: Vec<T>, index: &str) -> Option<T> {
    match matches.len() {
        1 => matches.pop(),
        0 => None,
        n => {
            tracing::warn!(index, matches = n, "Ambiguous unique lookup, returning no match");
            None
        }
    }
}

/// Collect every row of a result set through a row mapper.
pub(crate) async fn collect_rows<T>(
    mut rows: libsql::Rows,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(map(&row)?);
    }
    Ok(out)
}
