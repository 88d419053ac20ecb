//! Registry of open projects.
//!
//! # Responsibility
//! - Drive project lifecycle (open, create, save, close) through the
//!   project manager and broadcast the matching events.
//! - Track "never modified since load" and "has unsaved changes" per project.
//! - Keep a self-healing active-project selection.
//!
//! # Invariants
//! - A project is never both never-modified and unsaved: `mark_modified`
//!   moves it from the first set to the second.
//! - Events are emitted after the manager call or the transaction succeeded.
//! - Every surfaced error is returned and also broadcast as
//!   `CoreEvent::Error`.
//! - Read accessors never fail; they record failures in `last_error`.
//!   `last_error` uses interior mutability and is not thread-safe.

use super::error::{HubError, HubResult, LastError};
use super::project_manager::ProjectManager;
use super::tag_hub::TagHub;
use super::tree_hub::TreeHub;
use crate::event::{CoreEvent, EventBus};
use crate::model::schema::{ProjectField, TreeField, PROJECT_ROW_ID};
use crate::model::value::FieldValue;
use crate::model::{ProjectId, TagId};
use crate::repo::tree_repo::{SqliteTreeRepository, TreeRepository};
use crate::store::{FieldStore, StoreError};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Timestamp suffix appended to backup copies, e.g. `novel_2024-03-01-093000`.
static BACKUP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_\d{4}-\d{2}-\d{2}-\d{6}").expect("valid backup name regex")
});

/// Content seeded into a newly created project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectTemplate {
    /// No tree items.
    #[default]
    Empty,
    /// One project root item with a first chapter under it.
    Starter,
}

/// Open projects plus their dirty state and the active selection.
pub struct ProjectRegistry<M: ProjectManager> {
    manager: M,
    not_modified_once: Vec<ProjectId>,
    not_saved: Vec<ProjectId>,
    active: Cell<Option<ProjectId>>,
    to_be_closed: Option<ProjectId>,
    last_error: RefCell<Option<LastError>>,
    last_added_tag: Option<TagId>,
    events: EventBus,
}

impl<M: ProjectManager> ProjectRegistry<M> {
    pub fn new(manager: M) -> Self {
        Self::with_events(manager, EventBus::new())
    }

    pub fn with_events(manager: M, events: EventBus) -> Self {
        Self {
            manager,
            not_modified_once: Vec::new(),
            not_saved: Vec::new(),
            active: Cell::new(None),
            to_be_closed: None,
            last_error: RefCell::new(None),
            last_added_tag: None,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Tag operations on open projects.
    pub fn tags(&mut self) -> TagHub<'_, M> {
        TagHub::new(self)
    }

    /// Tree operations on open projects.
    pub fn tree(&mut self) -> TreeHub<'_, M> {
        TreeHub::new(self)
    }

    // ---- lifecycle ------------------------------------------------------

    /// Loads the project file at `path`.
    pub fn open(&mut self, path: &Path) -> HubResult<ProjectId> {
        let started_at = Instant::now();
        let project_id = match self.manager.load_project(path) {
            Ok(project_id) => project_id,
            Err(err) => return Err(self.fail(err)),
        };
        self.after_load(project_id)?;
        info!(
            "event=project_open module=service status=ok project_id={project_id} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(project_id)
    }

    /// Creates a new in-memory project, saving it to `path` when given.
    ///
    /// When that first save fails the project is closed again and only the
    /// error is returned.
    pub fn create(
        &mut self,
        template: ProjectTemplate,
        path: Option<&Path>,
    ) -> HubResult<ProjectId> {
        let project_id = match self.manager.create_empty_project() {
            Ok(project_id) => project_id,
            Err(err) => return Err(self.fail(err)),
        };
        if let Err(err) = self.seed(project_id, template) {
            return Err(self.fail(err));
        }
        self.after_load(project_id)?;

        if let Some(path) = path {
            let format = self.project_type(project_id);
            if let Err(err) = self.save_as(project_id, &format, path) {
                self.discard_unsaved(project_id);
                return Err(err);
            }
        }
        Ok(project_id)
    }

    fn after_load(&mut self, project_id: ProjectId) -> HubResult<()> {
        let renumbered = self
            .connection(project_id)
            .and_then(|conn| {
                SqliteTreeRepository::new(conn)
                    .renumber_sort_orders()
                    .map_err(|err| HubError::repo(project_id, err))
            });
        if let Err(err) = renumbered {
            return Err(self.fail(err));
        }

        push_unique(&mut self.not_modified_once, project_id);
        self.events.emit(CoreEvent::ProjectLoaded { project_id });
        self.events.emit(CoreEvent::ProjectCountChanged {
            count: self.project_count(),
        });
        self.set_active_project(Some(project_id));
        Ok(())
    }

    fn seed(&self, project_id: ProjectId, template: ProjectTemplate) -> HubResult<()> {
        if template == ProjectTemplate::Empty {
            return Ok(());
        }
        let store = FieldStore::<TreeField>::new(self.connection(project_id)?);
        store
            .with_transaction(|store| {
                store.add(&[
                    (TreeField::Title, FieldValue::from("Project")),
                    (TreeField::Indent, FieldValue::Integer(0)),
                    (TreeField::SortOrder, FieldValue::Integer(0)),
                    (TreeField::ProjectRoot, FieldValue::Bool(true)),
                ])?;
                store.add(&[
                    (TreeField::Title, FieldValue::from("Chapter 1")),
                    (TreeField::Indent, FieldValue::Integer(1)),
                    (TreeField::SortOrder, FieldValue::Integer(1)),
                ])?;
                Ok::<_, StoreError>(())
            })
            .map_err(|err| HubError::store(project_id, err))
    }

    /// Closes a created project whose first save failed, so no project is
    /// left open without the caller knowing its id.
    fn discard_unsaved(&mut self, project_id: ProjectId) {
        if let Err(err) = self.close(project_id) {
            warn!(
                "event=project_discard module=service status=error error_code={} project_id={project_id}",
                err.code()
            );
        }
    }

    /// Writes the project to its current path.
    pub fn save(&mut self, project_id: ProjectId) -> HubResult<()> {
        if let Err(err) = self.manager.save_project(project_id) {
            return Err(self.fail(err));
        }
        self.mark_saved(project_id);
        Ok(())
    }

    /// Writes the project to `path` and moves it there.
    ///
    /// A project whose previous path looked like a timestamped backup is
    /// demoted to a regular project.
    pub fn save_as(&mut self, project_id: ProjectId, format: &str, path: &Path) -> HubResult<()> {
        let was_backup = self
            .manager
            .project(project_id)
            .and_then(|project| project.path())
            .is_some_and(is_backup_path);
        if let Err(err) = self
            .manager
            .save_project_as(project_id, format, path, false)
        {
            return Err(self.fail(err));
        }

        self.events.emit(CoreEvent::ProjectPathChanged {
            project_id,
            path: Some(path.to_path_buf()),
        });
        if was_backup {
            self.events.emit(CoreEvent::ProjectIsBackupChanged {
                project_id,
                is_backup: false,
            });
        }
        self.mark_saved(project_id);
        Ok(())
    }

    /// Saves the project to `path`, then writes a copy of it there.
    pub fn save_copy(&mut self, project_id: ProjectId, format: &str, path: &Path) -> HubResult<()> {
        self.save_as(project_id, format, path)?;
        if let Err(err) = self.manager.save_project_as(project_id, format, path, true) {
            return Err(self.fail(err));
        }
        Ok(())
    }

    fn mark_saved(&mut self, project_id: ProjectId) {
        self.not_modified_once.retain(|id| *id != project_id);
        self.not_saved.retain(|id| *id != project_id);
        self.events.emit(CoreEvent::ProjectSaved { project_id });
        info!("event=project_save module=service status=ok project_id={project_id}");
    }

    /// Closes one project.
    ///
    /// Observers see `ProjectToBeClosed` while the project is still open.
    pub fn close(&mut self, project_id: ProjectId) -> HubResult<()> {
        self.to_be_closed = Some(project_id);
        self.events.emit(CoreEvent::ProjectToBeClosed { project_id });

        let closed = self.manager.close_project(project_id);
        self.to_be_closed = None;
        if let Err(err) = closed {
            return Err(self.fail(err));
        }

        self.not_modified_once.retain(|id| *id != project_id);
        self.not_saved.retain(|id| *id != project_id);
        self.events.emit(CoreEvent::ProjectClosed { project_id });
        self.events.emit(CoreEvent::ProjectCountChanged {
            count: self.project_count(),
        });
        if self.active.get() == Some(project_id) {
            let healed = self.active_project();
            self.events
                .emit(CoreEvent::ActiveProjectChanged { project_id: healed });
        }
        Ok(())
    }

    /// Closes every open project in list order.
    ///
    /// Stops at the first failure; later projects stay open.
    pub fn close_all(&mut self) -> HubResult<()> {
        for project_id in self.manager.project_id_list() {
            self.close(project_id)?;
        }
        self.events.emit(CoreEvent::AllProjectsClosed);
        Ok(())
    }

    pub fn is_project_to_be_closed(&self, project_id: ProjectId) -> bool {
        self.to_be_closed == Some(project_id)
    }

    // ---- dirty state ----------------------------------------------------

    /// Records a successful mutation of `project_id`.
    pub fn mark_modified(&mut self, project_id: ProjectId) {
        self.not_modified_once.retain(|id| *id != project_id);
        push_unique(&mut self.not_saved, project_id);
        self.events
            .emit(CoreEvent::ProjectNotSavedAnymore { project_id });
        self.events.emit(CoreEvent::ProjectModified { project_id });
    }

    pub fn is_not_modified_once(&self, project_id: ProjectId) -> bool {
        self.not_modified_once.contains(&project_id)
    }

    pub fn is_project_saved(&self, project_id: ProjectId) -> bool {
        !self.not_saved.contains(&project_id)
    }

    pub fn projects_not_modified_once(&self) -> &[ProjectId] {
        &self.not_modified_once
    }

    pub fn projects_not_saved(&self) -> &[ProjectId] {
        &self.not_saved
    }

    // ---- selection ------------------------------------------------------

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.manager.project_id_list()
    }

    pub fn project_count(&self) -> usize {
        self.manager.project_id_list().len()
    }

    /// Most recently opened project still open.
    pub fn last_loaded(&self) -> Option<ProjectId> {
        self.manager.project_id_list().last().copied()
    }

    /// Current active project, repaired against the open list on every read.
    ///
    /// `None` when nothing is open; the first open project when the stored
    /// id is stale; the only project when exactly one is open.
    pub fn active_project(&self) -> Option<ProjectId> {
        let ids = self.manager.project_id_list();
        let mut active = self.active.get();
        match ids.first() {
            None => active = None,
            Some(first) => {
                if ids.len() == 1 || !active.is_some_and(|id| ids.contains(&id)) {
                    active = Some(*first);
                }
            }
        }
        self.active.set(active);
        active
    }

    pub fn set_active_project(&self, project_id: Option<ProjectId>) {
        self.active.set(project_id);
        self.events
            .emit(CoreEvent::ActiveProjectChanged { project_id });
    }

    pub fn is_active(&self, project_id: ProjectId) -> bool {
        self.active_project() == Some(project_id)
    }

    // ---- read accessors (last-error side channel) -----------------------

    /// Path of the project; `None` when unsaved or unknown.
    pub fn path(&self, project_id: ProjectId) -> Option<PathBuf> {
        match self.manager.project(project_id) {
            Some(project) => project.path().map(Path::to_path_buf),
            None => {
                self.read_failed(HubError::ProjectNotFound(project_id));
                None
            }
        }
    }

    pub fn set_path(&mut self, project_id: ProjectId, path: Option<PathBuf>) -> HubResult<()> {
        if self.manager.project(project_id).is_none() {
            return Err(self.fail(HubError::ProjectNotFound(project_id)));
        }
        if let Some(project) = self.manager.project_mut(project_id) {
            project.set_path(path.clone());
        }
        self.events
            .emit(CoreEvent::ProjectPathChanged { project_id, path });
        Ok(())
    }

    /// Storage format; empty when the project is unknown.
    pub fn project_type(&self, project_id: ProjectId) -> String {
        match self.manager.project(project_id) {
            Some(project) => project.project_type().to_string(),
            None => {
                self.read_failed(HubError::ProjectNotFound(project_id));
                String::new()
            }
        }
    }

    pub fn is_url_already_loaded(&self, path: &Path) -> bool {
        self.manager.project_id_list().into_iter().any(|project_id| {
            self.manager
                .project(project_id)
                .and_then(|project| project.path())
                .is_some_and(|loaded| loaded == path)
        })
    }

    /// Whether the project file name carries a backup timestamp suffix.
    pub fn is_backup(&self, project_id: ProjectId) -> bool {
        self.path(project_id)
            .is_some_and(|path| is_backup_path(&path))
    }

    pub fn project_name(&self, project_id: ProjectId) -> String {
        self.project_text(project_id, ProjectField::Name)
    }

    pub fn lang_code(&self, project_id: ProjectId) -> String {
        self.project_text(project_id, ProjectField::SpellCheckLang)
    }

    pub fn unique_id(&self, project_id: ProjectId) -> String {
        self.project_text(project_id, ProjectField::UniqueIdentifier)
    }

    fn project_text(&self, project_id: ProjectId, field: ProjectField) -> String {
        let value = self.connection(project_id).and_then(|conn| {
            FieldStore::<ProjectField>::new(conn)
                .get(PROJECT_ROW_ID, field)
                .map_err(|err| HubError::store(project_id, err))
        });
        match value {
            Ok(value) => value.as_text().unwrap_or_default().to_string(),
            Err(err) => {
                self.read_failed(err);
                String::new()
            }
        }
    }

    pub fn set_project_name(&mut self, project_id: ProjectId, name: &str) -> HubResult<()> {
        self.set_project_text(project_id, ProjectField::Name, name)?;
        self.events.emit(CoreEvent::ProjectNameChanged {
            project_id,
            name: name.to_string(),
        });
        self.mark_modified(project_id);
        Ok(())
    }

    pub fn set_lang_code(&mut self, project_id: ProjectId, lang_code: &str) -> HubResult<()> {
        self.set_project_text(project_id, ProjectField::SpellCheckLang, lang_code)?;
        self.events.emit(CoreEvent::LangCodeChanged {
            project_id,
            lang_code: lang_code.to_string(),
        });
        self.mark_modified(project_id);
        Ok(())
    }

    fn set_project_text(
        &self,
        project_id: ProjectId,
        field: ProjectField,
        value: &str,
    ) -> HubResult<()> {
        let written = self.connection(project_id).and_then(|conn| {
            FieldStore::<ProjectField>::new(conn)
                .with_transaction(|store| {
                    store.set(PROJECT_ROW_ID, field, &FieldValue::from(value))?;
                    store.set_current_timestamp(PROJECT_ROW_ID, ProjectField::UpdateDate)
                })
                .map_err(|err| HubError::store(project_id, err))
        });
        written.map_err(|err| self.fail(err))
    }

    // ---- errors and plumbing --------------------------------------------

    /// Most recent failure recorded by a read accessor.
    pub fn last_error(&self) -> Option<LastError> {
        self.last_error.borrow().clone()
    }

    pub fn clear_last_error(&self) {
        self.last_error.replace(None);
    }

    pub(crate) fn last_added_tag(&self) -> Option<TagId> {
        self.last_added_tag
    }

    pub(crate) fn set_last_added_tag(&mut self, tag_id: TagId) {
        self.last_added_tag = Some(tag_id);
    }

    /// Working connection of an open project.
    pub fn connection(&self, project_id: ProjectId) -> HubResult<&Connection> {
        self.manager
            .project(project_id)
            .map(|project| project.connection())
            .ok_or(HubError::ProjectNotFound(project_id))
    }

    /// Logs and broadcasts `err`, then hands it back for returning.
    pub(crate) fn fail(&self, err: HubError) -> HubError {
        match &err {
            HubError::TransactionFailed { .. } | HubError::Db { .. } => error!(
                "event=hub_error module=service status=error error_code={} project_id={:?} error={}",
                err.code(),
                err.project_id(),
                err
            ),
            _ => warn!(
                "event=hub_error module=service status=error error_code={} project_id={:?} error={}",
                err.code(),
                err.project_id(),
                err
            ),
        }
        self.events.emit(CoreEvent::Error {
            code: err.code().to_string(),
            project_id: err.project_id(),
            message: err.to_string(),
        });
        err
    }

    fn read_failed(&self, err: HubError) {
        let err = self.fail(err);
        self.last_error.replace(Some(LastError::from(&err)));
    }
}

fn is_backup_path(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| BACKUP_NAME_RE.is_match(&name.to_string_lossy()))
}

fn push_unique(ids: &mut Vec<ProjectId>, project_id: ProjectId) {
    if !ids.contains(&project_id) {
        ids.push(project_id);
    }
}
