//! Tree item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - List `tbl_tree` rows in document order.
//! - Append items and keep sort orders on a stable stride.
//!
//! # Invariants
//! - Document order is deterministic: `l_sort_order ASC, l_tree_id ASC`.
//! - Renumbering preserves document order and only rewrites rows whose
//!   sort order actually changes.

use crate::model::schema::{Field, TreeField};
use crate::model::value::FieldValue;
use crate::model::ItemId;
use crate::repo::{RepoError, RepoResult};
use crate::store::{FieldStore, StoreError};
use log::info;
use rusqlite::{Connection, Row};

/// Gap between consecutive sort orders after renumbering.
pub const SORT_ORDER_STRIDE: i64 = 1000;

/// Structural columns of one tree item, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRow {
    pub item_id: ItemId,
    pub indent: i64,
    pub sort_order: i64,
    pub project_root: bool,
    pub trashed: bool,
}

/// Repository interface for ordered tree operations.
pub trait TreeRepository {
    /// Lists every item in document order.
    fn list_items(&self) -> RepoResult<Vec<TreeRow>>;
    /// Appends one item after the current last item.
    fn add_item(&self, indent: i64, title: &str) -> RepoResult<ItemId>;
    /// Rewrites sort orders to `SORT_ORDER_STRIDE` multiples.
    ///
    /// Returns how many rows were rewritten.
    fn renumber_sort_orders(&self) -> RepoResult<usize>;
}

/// SQLite-backed tree repository.
pub struct SqliteTreeRepository<'conn> {
    store: FieldStore<'conn, TreeField>,
}

impl<'conn> SqliteTreeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: FieldStore::new(conn),
        }
    }
}

impl TreeRepository for SqliteTreeRepository<'_> {
    fn list_items(&self) -> RepoResult<Vec<TreeRow>> {
        list_rows(self.store.connection())
    }

    fn add_item(&self, indent: i64, title: &str) -> RepoResult<ItemId> {
        self.store.with_transaction(|store| {
            let last: Option<i64> = store
                .connection()
                .query_row("SELECT MAX(l_sort_order) FROM tbl_tree;", [], |row| {
                    row.get(0)
                })
                .map_err(StoreError::from)?;
            let sort_order = last.map_or(SORT_ORDER_STRIDE, |value| value + SORT_ORDER_STRIDE);

            let item_id = store.add(&[
                (TreeField::Title, FieldValue::from(title)),
                (TreeField::Indent, FieldValue::Integer(indent)),
                (TreeField::SortOrder, FieldValue::Integer(sort_order)),
            ])?;
            Ok(item_id)
        })
    }

    fn renumber_sort_orders(&self) -> RepoResult<usize> {
        let rewritten = self.store.with_transaction(|store| {
            let rows = list_rows(store.connection())?;
            let mut rewritten = 0;
            for (index, row) in rows.iter().enumerate() {
                let target = (index as i64 + 1) * SORT_ORDER_STRIDE;
                if row.sort_order != target {
                    store.set(row.item_id, TreeField::SortOrder, &FieldValue::Integer(target))?;
                    rewritten += 1;
                }
            }
            Ok::<_, RepoError>(rewritten)
        })?;

        if rewritten > 0 {
            info!("event=tree_renumber module=repo status=ok rewritten={rewritten}");
        }
        Ok(rewritten)
    }
}

fn list_rows(conn: &Connection) -> RepoResult<Vec<TreeRow>> {
    let mut stmt = conn.prepare(
        "SELECT l_tree_id, l_indent, l_sort_order, b_project_root, b_trashed
         FROM tbl_tree
         ORDER BY l_sort_order ASC, l_tree_id ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_tree_row(row)?);
    }
    Ok(items)
}

fn parse_tree_row(row: &Row<'_>) -> RepoResult<TreeRow> {
    Ok(TreeRow {
        item_id: row.get(0)?,
        indent: read_integer(row, 1, TreeField::Indent)?,
        sort_order: read_integer(row, 2, TreeField::SortOrder)?,
        project_root: read_bool(row, 3, TreeField::ProjectRoot)?,
        trashed: read_bool(row, 4, TreeField::Trashed)?,
    })
}

fn read_integer(row: &Row<'_>, index: usize, field: TreeField) -> RepoResult<i64> {
    match decode(row, index, field)? {
        FieldValue::Integer(value) => Ok(value),
        _ => Ok(0),
    }
}

fn read_bool(row: &Row<'_>, index: usize, field: TreeField) -> RepoResult<bool> {
    match decode(row, index, field)? {
        FieldValue::Bool(value) => Ok(value),
        _ => Ok(false),
    }
}

fn decode(row: &Row<'_>, index: usize, field: TreeField) -> RepoResult<FieldValue> {
    let raw = row.get_ref(index)?;
    FieldValue::from_sql(raw, field.kind()).map_err(|found| {
        StoreError::TypeMismatch {
            column: field.column(),
            expected: field.kind(),
            found,
        }
        .into()
    })
}
