//! Tag/item relationship manager.
//!
//! # Responsibility
//! - Maintain `tbl_tag_relationship` rows linking tree items to tags.
//! - Answer "tags of item" and "items of tag" lookups.
//!
//! # Invariants
//! - `link` is find-or-create: at most one row is written per pair and an
//!   existing pair is reported as `created=false`, never as a conflict.
//! - `unlink` is not idempotent: a missing pair fails with
//!   `RelationshipNotFound`.
//! - Null or non-positive keys read back from the lookup count as absent.

use crate::model::schema::TagRelationshipField;
use crate::model::value::FieldValue;
use crate::model::{ItemId, RowId, TagId};
use crate::repo::{RepoError, RepoResult};
use crate::store::{Column, FieldStore, StoreError};
use log::{debug, warn};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};

/// Relationship accessor bound to one project connection.
pub struct RelationshipManager<'conn> {
    store: FieldStore<'conn, TagRelationshipField>,
}

impl<'conn> RelationshipManager<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            store: FieldStore::new(conn),
        }
    }

    /// Links `item_id` to `tag_id`.
    ///
    /// Returns `true` when a new row was inserted, `false` when the pair was
    /// already linked. Lookup and insert run in one transaction.
    pub fn link(&self, item_id: ItemId, tag_id: TagId) -> RepoResult<bool> {
        self.store.with_transaction(|store| {
            if !present_ids(pair_rows(store, item_id, tag_id)?).is_empty() {
                debug!(
                    "event=relationship_link module=repo status=ok created=false item_id={item_id} tag_id={tag_id}"
                );
                return Ok(false);
            }

            let row_id = store.add(&[
                (TagRelationshipField::TreeCode, FieldValue::Integer(item_id)),
                (TagRelationshipField::TagCode, FieldValue::Integer(tag_id)),
            ])?;
            debug!(
                "event=relationship_link module=repo status=ok created=true item_id={item_id} tag_id={tag_id} row_id={row_id}"
            );
            Ok(true)
        })
    }

    /// Removes the link between `item_id` and `tag_id`.
    ///
    /// Pairs that were duplicated by older writers are removed entirely.
    pub fn unlink(&self, item_id: ItemId, tag_id: TagId) -> RepoResult<()> {
        self.store.with_transaction(|store| {
            let row_ids = present_ids(pair_rows(store, item_id, tag_id)?);
            if row_ids.is_empty() {
                return Err(RepoError::RelationshipNotFound { item_id, tag_id });
            }
            if row_ids.len() > 1 {
                warn!(
                    "event=relationship_unlink module=repo status=duplicate item_id={item_id} tag_id={tag_id} rows={}",
                    row_ids.len()
                );
            }
            for row_id in row_ids {
                store.remove(row_id)?;
            }
            Ok(())
        })
    }

    /// Returns whether `item_id` and `tag_id` are linked.
    pub fn is_linked(&self, item_id: ItemId, tag_id: TagId) -> RepoResult<bool> {
        Ok(!present_ids(pair_rows(&self.store, item_id, tag_id)?).is_empty())
    }

    /// Tags linked to one item.
    pub fn tags_of(&self, item_id: ItemId) -> RepoResult<BTreeSet<TagId>> {
        let rows = self.store.values_where(
            Column::Field(TagRelationshipField::TagCode),
            &[(TagRelationshipField::TreeCode, FieldValue::Integer(item_id))],
        )?;
        Ok(present_ids(rows).into_iter().collect())
    }

    /// Items linked to one tag.
    pub fn items_of(&self, tag_id: TagId) -> RepoResult<BTreeSet<ItemId>> {
        let rows = self.store.values_where(
            Column::Field(TagRelationshipField::TreeCode),
            &[(TagRelationshipField::TagCode, FieldValue::Integer(tag_id))],
        )?;
        Ok(present_ids(rows).into_iter().collect())
    }

    /// Removes every relationship row of one tag. Returns the removed count.
    ///
    /// Must run inside the caller's transaction.
    pub(crate) fn remove_all_for_tag(&self, tag_id: TagId) -> RepoResult<usize> {
        let rows = self.store.values_where(
            Column::Id,
            &[(TagRelationshipField::TagCode, FieldValue::Integer(tag_id))],
        )?;
        let row_ids = present_ids(rows);
        for row_id in &row_ids {
            self.store.remove(*row_id)?;
        }
        Ok(row_ids.len())
    }
}

fn pair_rows(
    store: &FieldStore<'_, TagRelationshipField>,
    item_id: ItemId,
    tag_id: TagId,
) -> Result<BTreeMap<RowId, FieldValue>, StoreError> {
    store.values_where(
        Column::Id,
        &[
            (TagRelationshipField::TreeCode, FieldValue::Integer(item_id)),
            (TagRelationshipField::TagCode, FieldValue::Integer(tag_id)),
        ],
    )
}

/// Keeps positive integer values, in row order.
fn present_ids(rows: BTreeMap<RowId, FieldValue>) -> Vec<RowId> {
    rows.into_values()
        .filter_map(|value| value.as_integer())
        .filter(|id| *id > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::present_ids;
    use crate::model::value::FieldValue;
    use std::collections::BTreeMap;

    #[test]
    fn present_ids_drops_null_and_sentinel_keys() {
        let rows = BTreeMap::from([
            (1, FieldValue::Integer(11)),
            (2, FieldValue::Null),
            (3, FieldValue::Integer(0)),
            (4, FieldValue::Integer(-2)),
            (5, FieldValue::Integer(15)),
        ]);
        assert_eq!(present_ids(rows), vec![11, 15]);
    }
}
