use paleocount_core::db::migrations::latest_version;
use paleocount_core::db::{open_db, open_db_in_memory, DbError};
use paleocount_core::{RepoError, SqliteStore};
use rusqlite::Connection;

const TABLES: [&str; 13] = [
    "users",
    "sessions",
    "projects",
    "research_participations",
    "sections",
    "samples",
    "taxon_groups",
    "species",
    "fields",
    "choices",
    "features",
    "countings",
    "occurrences",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_file_database_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paleocount.db");

    let first = open_db(&path).unwrap();
    first
        .execute("INSERT INTO taxon_groups (name) VALUES ('Foraminifera');", [])
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let groups: i64 = second
        .query_row("SELECT COUNT(*) FROM taxon_groups;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(groups, 1);
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_database_directory_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let absent = dir.path().join("not-created");

    match open_db(absent.join("paleocount.db")).unwrap_err() {
        DbError::MissingDirectory(reported) => assert_eq!(reported, absent),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!absent.exists());
}

#[test]
fn store_requires_migrated_connection() {
    let raw = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteStore::try_new(&raw),
        Err(RepoError::UninitializedConnection { .. })
    ));
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
    assert!(conn
        .execute(
            "INSERT INTO sections (project_id, name, created_at) VALUES (42, 'orphan', 0);",
            []
        )
        .is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
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
