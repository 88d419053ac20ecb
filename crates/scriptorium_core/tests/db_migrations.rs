use scriptorium_core::db::migrations::latest_version;
use scriptorium_core::db::{
    load_db_into_memory, open_db, open_db_in_memory, save_db_to_file, DbError,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "tbl_project");
    assert_table_exists(&conn, "tbl_tree");
    assert_table_exists(&conn, "tbl_tag");
    assert_table_exists(&conn, "tbl_tag_relationship");

    let project_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM tbl_project;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(project_rows, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("novel.sqlite");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tbl_tree");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite");

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
fn working_copy_reaches_disk_only_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("novel.sqlite");
    drop(open_db(&path).unwrap());

    let working = load_db_into_memory(&path).unwrap();
    working
        .execute("INSERT INTO tbl_tree (t_title) VALUES ('Prologue');", [])
        .unwrap();
    assert_eq!(tree_rows(&open_db(&path).unwrap()), 0);

    save_db_to_file(&working, &path).unwrap();
    assert_eq!(tree_rows(&open_db(&path).unwrap()), 1);
}

#[test]
fn foreign_keys_cascade_tag_relationships() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tbl_tree (l_tree_id, t_title) VALUES (1, 'Intro');
         INSERT INTO tbl_tag (l_tag_id, t_name) VALUES (1, 'draft');
         INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (1, 1);
         DELETE FROM tbl_tree WHERE l_tree_id = 1;",
    )
    .unwrap();

    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM tbl_tag_relationship;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(links, 0);
}

fn tree_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM tbl_tree;", [], |row| row.get(0))
        .unwrap()
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
