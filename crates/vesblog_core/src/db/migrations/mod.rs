//! Blog schema migrations.
//!
//! # Invariants
//! - `version` values are strictly increasing.
//! - All pending migrations run in one transaction; the applied version is
//!   mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "post_relations",
        sql: include_str!("0002_post_relations.sql"),
    },
];

/// Schema position of one connection relative to this binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    UpToDate(u32),
    /// Versions between `current` and `latest` still need to run.
    Behind { current: u32, latest: u32 },
    Ahead { current: u32, latest: u32 },
}

/// Returns the latest schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

pub fn migration_status(conn: &Connection) -> DbResult<MigrationStatus> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    Ok(match current.cmp(&latest) {
        std::cmp::Ordering::Equal => MigrationStatus::UpToDate(current),
        std::cmp::Ordering::Less => MigrationStatus::Behind { current, latest },
        std::cmp::Ordering::Greater => MigrationStatus::Ahead { current, latest },
    })
}

/// Applies pending migrations and returns the versions that ran.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database is ahead of this binary.
/// - `Migration` naming the failed script; the whole batch is rolled back.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<Vec<u32>> {
    let current = match migration_status(conn)? {
        MigrationStatus::UpToDate(_) => return Ok(Vec::new()),
        MigrationStatus::Ahead { current, latest } => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: current,
                latest_supported: latest,
            })
        }
        MigrationStatus::Behind { current, .. } => current,
    };

    let tx = conn.transaction()?;
    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let script = format!(
            "{}\nPRAGMA user_version = {};",
            migration.sql, migration.version
        );
        if let Err(source) = tx.execute_batch(&script) {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={source}",
                migration.version, migration.name
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
        applied.push(migration.version);
    }
    tx.commit()?;

    Ok(applied)
}
