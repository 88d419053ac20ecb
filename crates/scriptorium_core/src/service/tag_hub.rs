//! Tag use-cases on open projects.
//!
//! # Responsibility
//! - Add, remove, look up and edit tags of one project.
//! - Link and unlink tags and tree items through the relationship manager.
//!
//! # Invariants
//! - Tag names are never empty (`name_is_missing`).
//! - Attribute setters bump `dt_updated` in the same transaction.
//! - Relationship events fire only when a row was actually written.
//! - Every successful mutation marks the project modified.

use super::error::{HubError, HubResult};
use super::project_manager::ProjectManager;
use super::project_registry::ProjectRegistry;
use crate::event::CoreEvent;
use crate::model::schema::TagField;
use crate::model::value::FieldValue;
use crate::model::{ItemId, ProjectId, TagId};
use crate::repo::relationship_repo::RelationshipManager;
use crate::repo::RepoError;
use crate::store::{Column, FieldStore, StoreError};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Borrowing facade over a registry for tag operations.
pub struct TagHub<'r, M: ProjectManager> {
    registry: &'r mut ProjectRegistry<M>,
}

impl<'r, M: ProjectManager> TagHub<'r, M> {
    pub(crate) fn new(registry: &'r mut ProjectRegistry<M>) -> Self {
        Self { registry }
    }

    /// All tag ids in ascending order.
    pub fn all_tag_ids(&self, project_id: ProjectId) -> HubResult<Vec<TagId>> {
        self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .ids()
                .map_err(|err| HubError::store(project_id, err))
        })
    }

    /// Adds one tag and returns its id.
    pub fn add_tag(&mut self, project_id: ProjectId, name: &str) -> HubResult<TagId> {
        ensure_name(project_id, name).map_err(|err| self.registry.fail(err))?;
        let tag_id = self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .with_transaction(|store| store.add(&[(TagField::Name, FieldValue::from(name))]))
                .map_err(|err| HubError::store(project_id, err))
        })?;

        self.registry.set_last_added_tag(tag_id);
        self.registry
            .events()
            .emit(CoreEvent::TagAdded { project_id, tag_id });
        self.registry.mark_modified(project_id);
        Ok(tag_id)
    }

    /// Removes one tag together with its relationship rows.
    pub fn remove_tag(&mut self, project_id: ProjectId, tag_id: TagId) -> HubResult<()> {
        self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .with_transaction(|store| {
                    RelationshipManager::new(store.connection()).remove_all_for_tag(tag_id)?;
                    store.remove(tag_id)?;
                    Ok::<_, RepoError>(())
                })
                .map_err(|err| HubError::repo(project_id, err))
        })?;

        self.registry
            .events()
            .emit(CoreEvent::TagRemoved { project_id, tag_id });
        self.registry.mark_modified(project_id);
        Ok(())
    }

    /// Id of the last tag added through any hub of this registry.
    pub fn last_added_id(&self) -> Option<TagId> {
        self.registry.last_added_tag()
    }

    /// Id of a tag named exactly `name`; the newest one if several match.
    pub fn tag_id_with_name(&self, project_id: ProjectId, name: &str) -> HubResult<Option<TagId>> {
        let matches = self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .values_where(Column::Id, &[(TagField::Name, FieldValue::from(name))])
                .map_err(|err| HubError::store(project_id, err))
        })?;
        Ok(matches
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(tag_id, _)| tag_id)
            .last())
    }

    pub fn tag_name_exists(&self, project_id: ProjectId, name: &str) -> HubResult<bool> {
        Ok(self.tag_id_with_name(project_id, name)?.is_some())
    }

    pub fn tag_name(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<String> {
        let value = self.get(project_id, tag_id, TagField::Name)?;
        Ok(value.as_text().unwrap_or_default().to_string())
    }

    pub fn set_tag_name(&mut self, project_id: ProjectId, tag_id: TagId, name: &str) -> HubResult<()> {
        ensure_name(project_id, name).map_err(|err| self.registry.fail(err))?;
        self.set(project_id, tag_id, TagField::Name, FieldValue::from(name))
    }

    pub fn tag_color(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<Option<String>> {
        let value = self.get(project_id, tag_id, TagField::Color)?;
        Ok(value.as_text().map(str::to_string))
    }

    pub fn set_tag_color(&mut self, project_id: ProjectId, tag_id: TagId, color: &str) -> HubResult<()> {
        self.set(project_id, tag_id, TagField::Color, FieldValue::from(color))
    }

    pub fn tag_text_color(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<Option<String>> {
        let value = self.get(project_id, tag_id, TagField::TextColor)?;
        Ok(value.as_text().map(str::to_string))
    }

    pub fn set_tag_text_color(
        &mut self,
        project_id: ProjectId,
        tag_id: TagId,
        color: &str,
    ) -> HubResult<()> {
        self.set(project_id, tag_id, TagField::TextColor, FieldValue::from(color))
    }

    /// Creation time in epoch milliseconds.
    pub fn creation_date(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<Option<i64>> {
        Ok(self.get(project_id, tag_id, TagField::CreationDate)?.as_timestamp())
    }

    pub fn set_creation_date(
        &mut self,
        project_id: ProjectId,
        tag_id: TagId,
        epoch_ms: i64,
    ) -> HubResult<()> {
        self.set(project_id, tag_id, TagField::CreationDate, FieldValue::Timestamp(epoch_ms))
    }

    /// Last update time in epoch milliseconds.
    pub fn update_date(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<Option<i64>> {
        Ok(self.get(project_id, tag_id, TagField::UpdateDate)?.as_timestamp())
    }

    pub fn set_update_date(
        &mut self,
        project_id: ProjectId,
        tag_id: TagId,
        epoch_ms: i64,
    ) -> HubResult<()> {
        self.set(project_id, tag_id, TagField::UpdateDate, FieldValue::Timestamp(epoch_ms))
    }

    // ---- relationships --------------------------------------------------

    /// Links a tree item to a tag. Returns `true` when a link was created.
    pub fn link(&mut self, project_id: ProjectId, item_id: ItemId, tag_id: TagId) -> HubResult<bool> {
        let created = self.run(project_id, |conn| {
            RelationshipManager::new(conn)
                .link(item_id, tag_id)
                .map_err(|err| HubError::repo(project_id, err))
        })?;

        if created {
            self.registry.events().emit(CoreEvent::RelationshipAdded {
                project_id,
                item_id,
                tag_id,
            });
            self.registry.mark_modified(project_id);
        }
        Ok(created)
    }

    /// Removes the link between a tree item and a tag.
    ///
    /// Fails with `no_tag_relationship_to_remove` when they are not linked.
    pub fn unlink(&mut self, project_id: ProjectId, item_id: ItemId, tag_id: TagId) -> HubResult<()> {
        self.run(project_id, |conn| {
            RelationshipManager::new(conn)
                .unlink(item_id, tag_id)
                .map_err(|err| HubError::repo(project_id, err))
        })?;

        self.registry.events().emit(CoreEvent::RelationshipRemoved {
            project_id,
            item_id,
            tag_id,
        });
        self.registry.mark_modified(project_id);
        Ok(())
    }

    pub fn tags_of_item(&self, project_id: ProjectId, item_id: ItemId) -> HubResult<BTreeSet<TagId>> {
        self.run(project_id, |conn| {
            RelationshipManager::new(conn)
                .tags_of(item_id)
                .map_err(|err| HubError::repo(project_id, err))
        })
    }

    pub fn items_of_tag(&self, project_id: ProjectId, tag_id: TagId) -> HubResult<BTreeSet<ItemId>> {
        self.run(project_id, |conn| {
            RelationshipManager::new(conn)
                .items_of(tag_id)
                .map_err(|err| HubError::repo(project_id, err))
        })
    }

    // ---- plumbing -------------------------------------------------------

    fn get(&self, project_id: ProjectId, tag_id: TagId, field: TagField) -> HubResult<FieldValue> {
        self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .get(tag_id, field)
                .map_err(|err| HubError::store(project_id, err))
        })
    }

    fn set(
        &mut self,
        project_id: ProjectId,
        tag_id: TagId,
        field: TagField,
        value: FieldValue,
    ) -> HubResult<()> {
        self.run(project_id, |conn| {
            FieldStore::<TagField>::new(conn)
                .with_transaction(|store| {
                    store.set(tag_id, field, &value)?;
                    if field != TagField::UpdateDate {
                        store.set_current_timestamp(tag_id, TagField::UpdateDate)?;
                    }
                    Ok::<_, StoreError>(())
                })
                .map_err(|err| HubError::store(project_id, err))
        })?;

        self.registry.events().emit(CoreEvent::TagFieldChanged {
            project_id,
            tag_id,
            field,
        });
        self.registry.mark_modified(project_id);
        Ok(())
    }

    /// Runs `body` on the project connection, broadcasting any failure.
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

fn ensure_name(project_id: ProjectId, name: &str) -> HubResult<()> {
    if name.trim().is_empty() {
        return Err(HubError::ValidationFailed {
            project_id,
            reason: "name_is_missing",
        });
    }
    Ok(())
}
