use rusqlite::Connection;
use todo_core::db::migrations::{apply_migrations, current_version, latest_version, step_migrations};
use todo_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert_eq!(user_version(&conn), latest_version());
    assert_table_exists(&conn, "tasks");
    assert_table_exists(&conn, "schema_migrations");
    assert_eq!(ledger_versions(&conn), (1..=latest_version()).collect::<Vec<_>>());

    let columns = table_columns(&conn, "tasks");
    for expected in [
        "id",
        "title",
        "description",
        "tags",
        "status",
        "priority",
        "due_date",
        "created_at",
        "modified_at",
    ] {
        assert!(columns.iter().any(|column| column == expected), "{expected}");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(current_version(&conn_first).unwrap(), latest_version());
    drop(conn_first);

    let mut conn_second = open_db(&path).unwrap();
    assert_eq!(ledger_versions(&conn_second).len(), latest_version() as usize);
    assert_eq!(apply_migrations(&mut conn_second).unwrap(), 0);
    assert_eq!(ledger_versions(&conn_second).len(), latest_version() as usize);
}

#[test]
fn opening_empty_precreated_file_bootstraps_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    std::fs::File::create(&path).unwrap();

    let conn = open_db(&path).unwrap();
    assert_table_exists(&conn, "tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn step_migrations_applies_exactly_requested_steps() {
    let mut conn = Connection::open_in_memory().unwrap();

    assert_eq!(step_migrations(&mut conn, 0).unwrap(), 0);
    assert_eq!(current_version(&conn).unwrap(), 0);

    assert_eq!(step_migrations(&mut conn, 1).unwrap(), 1);
    assert_eq!(current_version(&conn).unwrap(), 1);
    assert_table_exists(&conn, "tasks");
    assert!(!table_columns(&conn, "tasks").contains(&"tags".to_string()));

    let remaining = latest_version() - 1;
    assert_eq!(step_migrations(&mut conn, remaining).unwrap(), remaining as usize);
    assert_eq!(current_version(&conn).unwrap(), latest_version());
    assert!(table_columns(&conn, "tasks").contains(&"tags".to_string()));
}

#[test]
fn step_migrations_rejects_more_steps_than_pending() {
    let mut conn = Connection::open_in_memory().unwrap();
    step_migrations(&mut conn, 1).unwrap();

    let err = step_migrations(&mut conn, latest_version()).unwrap_err();
    match err {
        DbError::NotEnoughPendingMigrations {
            requested,
            available,
        } => {
            assert_eq!(requested, latest_version());
            assert_eq!(available, latest_version() - 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(current_version(&conn).unwrap(), 1);
}

#[test]
fn apply_after_partial_step_finishes_remaining_migrations() {
    let mut conn = Connection::open_in_memory().unwrap();
    step_migrations(&mut conn, 1).unwrap();

    let applied = apply_migrations(&mut conn).unwrap();

    assert_eq!(applied, latest_version() as usize - 1);
    assert_eq!(ledger_versions(&conn), (1..=latest_version()).collect::<Vec<_>>());
}

#[test]
fn failed_migration_leaves_no_partial_state() {
    let mut conn = Connection::open_in_memory().unwrap();
    step_migrations(&mut conn, 1).unwrap();
    // Migration 2 adds `tags`; a pre-existing column makes it fail midway.
    conn.execute_batch("ALTER TABLE tasks ADD COLUMN tags TEXT;")
        .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));

    assert_eq!(current_version(&conn).unwrap(), 1);
    assert!(!table_columns(&conn, "tasks").contains(&"description".to_string()));
}

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn ledger_versions(conn: &Connection) -> Vec<u32> {
    let mut stmt = conn
        .prepare("SELECT version FROM schema_migrations ORDER BY version;")
        .unwrap();
    let rows = stmt.query_map([], |row| row.get(0)).unwrap();
    rows.map(Result::unwrap).collect()
}

fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, String>(1)).unwrap();
    rows.map(Result::unwrap).collect()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
