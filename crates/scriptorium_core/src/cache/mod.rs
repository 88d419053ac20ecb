//! In-memory hierarchical view of one project's tree.
//!
//! # Responsibility
//! - Hold the ordered item sequence of one project.
//! - Materialize item roles lazily from the field store.
//! - Derive parent/row/children from indent levels.
//!
//! # Invariants
//! - The held sequence satisfies `indent(k + 1) <= indent(k) + 1`; rows
//!   violating it are clamped on construction.
//! - Invalidation is always targeted to one item; there is no cache-wide
//!   generation counter.
//! - The cache never writes; callers invalidate after their own writes.

mod derive;
mod item;

pub use derive::{
    child_of, children_count_of, children_of, parent_of, repair_indents, row_of, Indented,
};
pub use item::TreeItem;

use crate::model::role::ItemRole;
use crate::model::schema::TreeField;
use crate::model::value::FieldValue;
use crate::model::{ItemId, ProjectId};
use crate::repo::tree_repo::TreeRow;
use crate::store::{FieldStore, StoreError, StoreResult};
use log::warn;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from cache lookups.
#[derive(Debug)]
pub enum CacheError {
    /// Position is outside the held sequence.
    IndexOutOfRange { index: usize, len: usize },
    /// Requested child index is not below the children count.
    ChildOutOfRange {
        item_id: ItemId,
        requested: usize,
        count: usize,
    },
    /// Materializing a role from the store failed.
    Store(StoreError),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "tree index {index} out of range (len {len})")
            }
            Self::ChildOutOfRange {
                item_id,
                requested,
                count,
            } => write!(
                f,
                "item {item_id} has {count} children, child {requested} requested"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::IndexOutOfRange { .. } | Self::ChildOutOfRange { .. } => None,
        }
    }
}

impl From<StoreError> for CacheError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Source of stored item fields.
pub trait ItemFieldSource {
    fn item_field(&self, item_id: ItemId, field: TreeField) -> StoreResult<FieldValue>;
}

impl ItemFieldSource for FieldStore<'_, TreeField> {
    fn item_field(&self, item_id: ItemId, field: TreeField) -> StoreResult<FieldValue> {
        self.get(item_id, field)
    }
}

/// Ordered, lazily materialized items of one project.
#[derive(Debug, Clone)]
pub struct TreeItemCache {
    project_id: ProjectId,
    items: Vec<TreeItem>,
    positions: HashMap<ItemId, usize>,
    repaired: usize,
}

impl TreeItemCache {
    /// Builds the cache from rows already in document order.
    pub fn new(project_id: ProjectId, rows: &[TreeRow]) -> Self {
        let mut indents: Vec<i64> = rows.iter().map(|row| row.indent).collect();
        let repaired = repair_indents(&mut indents);
        if repaired > 0 {
            warn!(
                "event=tree_cache_build module=cache status=repaired project_id={project_id} repaired={repaired}"
            );
        }

        let items: Vec<TreeItem> = rows
            .iter()
            .zip(indents)
            .map(|(row, indent)| TreeItem::from_row(project_id, row, indent))
            .collect();
        let positions = items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.item_id(), index))
            .collect();

        Self {
            project_id,
            items,
            positions,
            repaired,
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of rows whose indent was clamped on construction.
    pub fn repaired_count(&self) -> usize {
        self.repaired
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> CacheResult<&TreeItem> {
        self.items.get(index).ok_or(CacheError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Position of `item_id` in document order.
    pub fn position(&self, item_id: ItemId) -> Option<usize> {
        self.positions.get(&item_id).copied()
    }

    /// Returns one role of the item at `index`.
    ///
    /// A valid cached value is returned as is, even if the row changed since;
    /// stale or missing roles are recomputed and cached.
    pub fn field(
        &mut self,
        index: usize,
        role: ItemRole,
        source: &impl ItemFieldSource,
    ) -> CacheResult<FieldValue> {
        let has_children = children_count_of(&self.items, index) > 0;
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(CacheError::IndexOutOfRange { index, len })?;

        if let Some(value) = item.structural(role) {
            return Ok(value);
        }
        if let Some(value) = item.cached(role) {
            return Ok(value.clone());
        }

        let value = match role.tree_field() {
            Some(field) => source.item_field(item.item_id(), field)?,
            None => FieldValue::Bool(has_children),
        };
        item.store(role, value.clone());
        Ok(value)
    }

    /// Marks one role of one item stale. Returns `false` for unknown items.
    pub fn invalidate(&mut self, item_id: ItemId, role: ItemRole) -> bool {
        match self.position(item_id) {
            Some(index) => {
                self.items[index].invalidate(role);
                true
            }
            None => false,
        }
    }

    /// Marks every role of one item stale. Returns `false` for unknown items.
    pub fn invalidate_all(&mut self, item_id: ItemId) -> bool {
        match self.position(item_id) {
            Some(index) => {
                self.items[index].invalidate_all();
                true
            }
            None => false,
        }
    }

    pub fn parent(&self, index: usize) -> CacheResult<Option<usize>> {
        self.item(index)?;
        Ok(parent_of(&self.items, index))
    }

    pub fn row(&self, index: usize) -> CacheResult<usize> {
        self.item(index)?;
        Ok(row_of(&self.items, index))
    }

    pub fn children_count(&self, index: usize) -> CacheResult<usize> {
        self.item(index)?;
        Ok(children_count_of(&self.items, index))
    }

    /// Position of the `n`-th child of the item at `index`.
    pub fn child(&self, index: usize, n: usize) -> CacheResult<usize> {
        let item = self.item(index)?;
        let children = children_of(&self.items, index);
        children
            .get(n)
            .copied()
            .ok_or(CacheError::ChildOutOfRange {
                item_id: item.item_id(),
                requested: n,
                count: children.len(),
            })
    }
}
