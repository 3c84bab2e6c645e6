//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations one transaction per version.
//! - Record every applied version in the `schema_migrations` ledger.
//!
//! # Invariants
//! - `version` values must remain monotonic and start at 1.
//! - A migration and its ledger row commit together or not at all.
//! - Re-running against a current store changes nothing.

use crate::db::{DbError, DbResult};
use chrono::Utc;
use log::info;
use rusqlite::{params, Connection};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_tasks",
        sql: include_str!("0001_create_tasks.sql"),
    },
    Migration {
        version: 2,
        name: "task_details",
        sql: include_str!("0002_task_details.sql"),
    },
    Migration {
        version: 3,
        name: "task_indexes",
        sql: include_str!("0003_task_indexes.sql"),
    },
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at INTEGER NOT NULL
);";

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the schema version currently recorded by the store.
///
/// The larger of the ledger maximum and `PRAGMA user_version` wins, so a
/// store written by a newer binary is never mistaken for an older one.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let has_ledger: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'
        );",
        [],
        |row| row.get(0),
    )?;
    let ledger: u32 = if has_ledger {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations;",
            [],
            |row| row.get(0),
        )?
    } else {
        0
    };
    let user_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(ledger.max(user_version))
}

/// Applies all pending migrations on the provided connection.
///
/// Returns the number of migrations applied; `0` when already current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let current = checked_current_version(conn)?;
    let pending = pending_migrations(current);
    run_migrations(conn, current, pending)
}

/// Applies exactly `steps` pending migrations in ascending order.
///
/// Intended for controlled rollout and tests; normal startup goes through
/// [`apply_migrations`]. Fails without applying anything when fewer than
/// `steps` migrations are pending.
pub fn step_migrations(conn: &mut Connection, steps: u32) -> DbResult<usize> {
    let current = checked_current_version(conn)?;
    let pending = pending_migrations(current);
    let available = u32::try_from(pending.len()).unwrap_or(u32::MAX);
    if steps > available {
        return Err(DbError::NotEnoughPendingMigrations {
            requested: steps,
            available,
        });
    }

    run_migrations(conn, current, &pending[..steps as usize])
}

fn checked_current_version(conn: &Connection) -> DbResult<u32> {
    conn.execute_batch(LEDGER_DDL)?;
    let current = current_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    Ok(current)
}

fn pending_migrations(current: u32) -> &'static [Migration] {
    let first_pending = MIGRATIONS
        .iter()
        .position(|migration| migration.version > current)
        .unwrap_or(MIGRATIONS.len());
    &MIGRATIONS[first_pending..]
}

fn run_migrations(conn: &mut Connection, from: u32, batch: &[Migration]) -> DbResult<usize> {
    for migration in batch {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2);",
            params![migration.version, Utc::now().timestamp_millis()],
        )?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }

    if let Some(last) = batch.last() {
        info!(
            "event=db_migrate_done module=db status=ok from_version={} to_version={} applied={}",
            from,
            last.version,
            batch.len()
        );
    }

    Ok(batch.len())
}
