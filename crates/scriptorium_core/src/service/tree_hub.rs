//! Tree item use-cases on open projects.
//!
//! # Responsibility
//! - Build `TreeItemCache` snapshots of a project tree.
//! - Write item fields and keep a caller-held cache coherent.
//! - Bridge the word meter: dispatch counts, then apply the reports.
//!
//! # Invariants
//! - Field writes bump `dt_updated` (and `dt_content` for content) in the
//!   same transaction.
//! - The supplied cache is invalidated only after the write committed.
//! - Writes to fields held by the cached items themselves (indent, sort
//!   order, project root flag) rebuild the cache.
//! - A committed write is announced and marks the project modified even
//!   when rebuilding the cache fails afterwards.

use super::error::{HubError, HubResult};
use super::project_manager::ProjectManager;
use super::project_registry::ProjectRegistry;
use super::word_meter::{WordCountReport, WordMeter};
use crate::cache::TreeItemCache;
use crate::event::CoreEvent;
use crate::model::role::ItemRole;
use crate::model::schema::TreeField;
use crate::model::value::FieldValue;
use crate::model::{ItemId, ProjectId};
use crate::repo::tree_repo::{SqliteTreeRepository, TreeRepository};
use crate::store::{FieldStore, StoreError};
use rusqlite::Connection;

/// Borrowing facade over a registry for tree operations.
pub struct TreeHub<'r, M: ProjectManager> {
    registry: &'r mut ProjectRegistry<M>,
}

impl<'r, M: ProjectManager> TreeHub<'r, M> {
    pub(crate) fn new(registry: &'r mut ProjectRegistry<M>) -> Self {
        Self { registry }
    }

    /// Reads the whole tree in document order into a fresh cache.
    pub fn load_cache(&self, project_id: ProjectId) -> HubResult<TreeItemCache> {
        let rows = self.run(project_id, |conn| {
            SqliteTreeRepository::new(conn)
                .list_items()
                .map_err(|err| HubError::repo(project_id, err))
        })?;
        Ok(TreeItemCache::new(project_id, &rows))
    }

    /// Rewrites sort orders to a stable stride. Returns rewritten rows.
    pub fn renumber_sort_orders(&mut self, project_id: ProjectId) -> HubResult<usize> {
        let rewritten = self.run(project_id, |conn| {
            SqliteTreeRepository::new(conn)
                .renumber_sort_orders()
                .map_err(|err| HubError::repo(project_id, err))
        })?;
        if rewritten > 0 {
            self.registry.mark_modified(project_id);
        }
        Ok(rewritten)
    }

    /// Appends one item at the end of the document.
    pub fn add_item(&mut self, project_id: ProjectId, indent: i64, title: &str) -> HubResult<ItemId> {
        let item_id = self.run(project_id, |conn| {
            SqliteTreeRepository::new(conn)
                .add_item(indent, title)
                .map_err(|err| HubError::repo(project_id, err))
        })?;
        self.registry
            .events()
            .emit(CoreEvent::ItemAdded { project_id, item_id });
        self.registry.mark_modified(project_id);
        Ok(item_id)
    }

    /// Reads one stored field, bypassing any cache.
    pub fn item_field(
        &self,
        project_id: ProjectId,
        item_id: ItemId,
        field: TreeField,
    ) -> HubResult<FieldValue> {
        self.run(project_id, |conn| {
            FieldStore::<TreeField>::new(conn)
                .get(item_id, field)
                .map_err(|err| HubError::store(project_id, err))
        })
    }

    /// Reads one role through `cache`, materializing it from the store.
    pub fn cached_field(
        &self,
        cache: &mut TreeItemCache,
        index: usize,
        role: ItemRole,
    ) -> HubResult<FieldValue> {
        let project_id = cache.project_id();
        self.run(project_id, |conn| {
            cache
                .field(index, role, &FieldStore::<TreeField>::new(conn))
                .map_err(|err| HubError::cache(project_id, err))
        })
    }

    /// Writes one item field and invalidates the matching roles in `cache`.
    pub fn set_item_field(
        &mut self,
        project_id: ProjectId,
        item_id: ItemId,
        field: TreeField,
        value: FieldValue,
        cache: Option<&mut TreeItemCache>,
    ) -> HubResult<()> {
        self.run(project_id, |conn| {
            FieldStore::<TreeField>::new(conn)
                .with_transaction(|store| {
                    store.set(item_id, field, &value)?;
                    if field != TreeField::UpdateDate {
                        store.set_current_timestamp(item_id, TreeField::UpdateDate)?;
                    }
                    if field == TreeField::Content {
                        store.set_current_timestamp(item_id, TreeField::ContentDate)?;
                    }
                    Ok::<_, StoreError>(())
                })
                .map_err(|err| HubError::store(project_id, err))
        })?;

        let role = ItemRole::for_field(field);
        self.registry.events().emit(CoreEvent::ItemFieldChanged {
            project_id,
            item_id,
            role,
        });
        self.registry.mark_modified(project_id);

        if let Some(cache) = cache {
            if is_structural(field) {
                *cache = self.load_cache(project_id)?;
            } else {
                if let Some(role) = role {
                    cache.invalidate(item_id, role);
                }
                cache.invalidate(item_id, ItemRole::UpdateDate);
                if field == TreeField::Content {
                    cache.invalidate(item_id, ItemRole::ContentDate);
                }
            }
        }
        Ok(())
    }

    /// Sends the item content to `meter` for counting.
    pub fn count_text(
        &self,
        meter: &mut WordMeter,
        project_id: ProjectId,
        item_id: ItemId,
        same_thread: bool,
        mark_modified: bool,
    ) -> HubResult<()> {
        let content = self.item_field(project_id, item_id, TreeField::Content)?;
        let text = content.as_text().unwrap_or_default().to_string();
        meter.count_text(project_id, item_id, text, same_thread, mark_modified);
        Ok(())
    }

    /// Stores the counts of one word meter report.
    pub fn apply_counts(
        &mut self,
        report: &WordCountReport,
        cache: Option<&mut TreeItemCache>,
    ) -> HubResult<()> {
        let WordCountReport {
            project_id,
            item_id,
            counts,
            mark_modified,
        } = *report;
        self.run(project_id, |conn| {
            FieldStore::<TreeField>::new(conn)
                .with_transaction(|store| {
                    store.set(item_id, TreeField::WordCount, &FieldValue::Integer(counts.words))?;
                    store.set(
                        item_id,
                        TreeField::CharCount,
                        &FieldValue::Integer(counts.characters),
                    )
                })
                .map_err(|err| HubError::store(project_id, err))
        })?;

        if let Some(cache) = cache {
            cache.invalidate(item_id, ItemRole::WordCount);
            cache.invalidate(item_id, ItemRole::CharCount);
        }
        for role in [ItemRole::WordCount, ItemRole::CharCount] {
            self.registry.events().emit(CoreEvent::ItemFieldChanged {
                project_id,
                item_id,
                role: Some(role),
            });
        }
        if mark_modified {
            self.registry.mark_modified(project_id);
        }
        Ok(())
    }

    fn run<T>(
        &self,
        project_id: ProjectId,
        body: impl FnOnce(&Connection) -> HubResult<T>,
    ) -> HubResult<T> {
        self.registry
            .connection(project_id)
            .and_then(body)
            .map_err(|err| self.registry.fail(err))
    }
}

/// Fields copied into `TreeItem` rather than cached per role.
fn is_structural(field: TreeField) -> bool {
    matches!(
        field,
        TreeField::Indent | TreeField::SortOrder | TreeField::ProjectRoot
    )
}
