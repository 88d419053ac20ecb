//! One cached tree item with per-role validity.

use crate::model::role::ItemRole;
use crate::model::value::FieldValue;
use crate::model::{ItemId, ProjectId};
use crate::repo::tree_repo::TreeRow;
use std::collections::{HashMap, HashSet};

use super::derive::Indented;

/// Cached view of one `tbl_tree` row.
///
/// Structural columns are held directly; every other role is materialized
/// lazily and stays valid until invalidated.
#[derive(Debug, Clone)]
pub struct TreeItem {
    project_id: ProjectId,
    item_id: ItemId,
    indent: i64,
    sort_order: i64,
    is_project_root: bool,
    data: HashMap<ItemRole, FieldValue>,
    invalidated: HashSet<ItemRole>,
}

impl TreeItem {
    pub(crate) fn from_row(project_id: ProjectId, row: &TreeRow, indent: i64) -> Self {
        Self {
            project_id,
            item_id: row.item_id,
            indent,
            sort_order: row.sort_order,
            is_project_root: row.project_root,
            data: HashMap::new(),
            invalidated: HashSet::new(),
        }
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Depth in display order; 0 for roots.
    pub fn indent_level(&self) -> usize {
        usize::try_from(self.indent).unwrap_or(0)
    }

    pub fn sort_order(&self) -> i64 {
        self.sort_order
    }

    pub fn is_project_root(&self) -> bool {
        self.is_project_root
    }

    /// Value answered from the item itself, without any lookup.
    pub(crate) fn structural(&self, role: ItemRole) -> Option<FieldValue> {
        match role {
            ItemRole::ProjectId => Some(FieldValue::Integer(i64::from(self.project_id))),
            ItemRole::ItemId => Some(FieldValue::Integer(self.item_id)),
            ItemRole::Indent => Some(FieldValue::Integer(self.indent)),
            ItemRole::SortOrder => Some(FieldValue::Integer(self.sort_order)),
            _ => None,
        }
    }

    /// Returns the cached value when the role is valid.
    pub fn cached(&self, role: ItemRole) -> Option<&FieldValue> {
        if self.invalidated.contains(&role) {
            return None;
        }
        self.data.get(&role)
    }

    pub fn is_valid(&self, role: ItemRole) -> bool {
        self.cached(role).is_some()
    }

    pub(crate) fn store(&mut self, role: ItemRole, value: FieldValue) {
        self.invalidated.remove(&role);
        self.data.insert(role, value);
    }

    /// Marks one role stale. Other roles are untouched.
    pub fn invalidate(&mut self, role: ItemRole) {
        self.invalidated.insert(role);
    }

    /// Drops every cached role.
    pub fn invalidate_all(&mut self) {
        self.data.clear();
        self.invalidated.clear();
    }
}

impl Indented for TreeItem {
    fn indent(&self) -> i64 {
        self.indent
    }
}

#[cfg(test)]
mod tests {
    use super::TreeItem;
    use crate::model::role::ItemRole;
    use crate::model::value::FieldValue;
    use crate::repo::tree_repo::TreeRow;

    fn item() -> TreeItem {
        let row = TreeRow {
            item_id: 4,
            indent: 1,
            sort_order: 2000,
            project_root: false,
            trashed: false,
        };
        TreeItem::from_row(0, &row, 1)
    }

    #[test]
    fn invalidating_one_role_keeps_the_others() {
        let mut item = item();
        item.store(ItemRole::Name, FieldValue::from("Intro"));
        item.store(ItemRole::Label, FieldValue::from("draft"));

        item.invalidate(ItemRole::Name);
        assert_eq!(item.cached(ItemRole::Name), None);
        assert_eq!(item.cached(ItemRole::Label), Some(&FieldValue::from("draft")));

        item.store(ItemRole::Name, FieldValue::from("Prologue"));
        assert!(item.is_valid(ItemRole::Name));
    }

    #[test]
    fn invalidate_all_clears_every_role() {
        let mut item = item();
        item.store(ItemRole::Name, FieldValue::from("Intro"));
        item.store(ItemRole::WordCount, FieldValue::Integer(12));

        item.invalidate_all();
        assert!(ItemRole::ALL.into_iter().all(|role| !item.is_valid(role)));
    }
}
