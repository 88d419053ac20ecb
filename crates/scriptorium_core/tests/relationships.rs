use scriptorium_core::db::open_db_in_memory;
use scriptorium_core::{RelationshipManager, RepoError};
use rusqlite::Connection;
use std::collections::BTreeSet;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tbl_tree (l_tree_id, t_title) VALUES (1, 'Intro'), (2, 'Chapter');
         INSERT INTO tbl_tag (l_tag_id, t_name) VALUES (10, 'draft'), (11, 'final');",
    )
    .unwrap();
    conn
}

fn link_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM tbl_tag_relationship;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn linking_twice_keeps_one_row() {
    let conn = seeded();
    let relationships = RelationshipManager::new(&conn);

    assert!(relationships.link(1, 10).unwrap());
    assert!(!relationships.link(1, 10).unwrap());

    assert_eq!(link_rows(&conn), 1);
    assert!(relationships.is_linked(1, 10).unwrap());
    assert_eq!(relationships.tags_of(1).unwrap(), BTreeSet::from([10]));
    assert_eq!(relationships.items_of(10).unwrap(), BTreeSet::from([1]));
}

#[test]
fn unlinking_a_missing_pair_fails_without_changes() {
    let conn = seeded();
    let relationships = RelationshipManager::new(&conn);
    relationships.link(2, 11).unwrap();

    let err = relationships.unlink(1, 10).unwrap_err();
    assert!(matches!(
        err,
        RepoError::RelationshipNotFound {
            item_id: 1,
            tag_id: 10
        }
    ));
    assert_eq!(err.code(), "no_tag_relationship_to_remove");
    assert_eq!(link_rows(&conn), 1);
}

#[test]
fn unlinking_removes_duplicated_pairs() {
    let conn = seeded();
    conn.execute_batch(
        "INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (1, 10);
         INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (1, 10);",
    )
    .unwrap();
    let relationships = RelationshipManager::new(&conn);

    relationships.unlink(1, 10).unwrap();

    assert_eq!(link_rows(&conn), 0);
    assert!(!relationships.is_linked(1, 10).unwrap());
}

#[test]
fn rows_with_missing_ends_are_ignored() {
    let conn = seeded();
    conn.execute_batch(
        "INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (1, NULL);
         INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (NULL, 10);
         INSERT INTO tbl_tag_relationship (l_tree_code, l_tag_code) VALUES (2, 11);",
    )
    .unwrap();
    let relationships = RelationshipManager::new(&conn);

    assert_eq!(relationships.tags_of(1).unwrap(), BTreeSet::new());
    assert_eq!(relationships.items_of(10).unwrap(), BTreeSet::new());
    assert_eq!(relationships.tags_of(2).unwrap(), BTreeSet::from([11]));
    assert!(!relationships.is_linked(1, 10).unwrap());
}
