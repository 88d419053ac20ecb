//! Open project handles and their persistence.
//!
//! # Responsibility
//! - Allocate project ids and own one working connection per open project.
//! - Load project files into in-memory working copies and write them back.
//!
//! # Invariants
//! - Ids are allocated monotonically and never reused within one manager.
//! - `project_id_list` keeps open order.
//! - A project file on disk is only written by `save_project*`.

use super::error::{HubError, HubResult};
use crate::db::{load_db_into_memory, open_db_in_memory, save_db_to_file};
use crate::model::schema::{ProjectField, PROJECT_ROW_ID};
use crate::model::value::FieldValue;
use crate::model::ProjectId;
use crate::store::FieldStore;
use log::info;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Storage format written by [`SqliteProjectManager`].
pub const DEFAULT_PROJECT_TYPE: &str = "sqlite";

/// One open project.
#[derive(Debug)]
pub struct Project {
    id: ProjectId,
    connection: Connection,
    path: Option<PathBuf>,
    project_type: String,
}

impl Project {
    pub fn new(
        id: ProjectId,
        connection: Connection,
        path: Option<PathBuf>,
        project_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            connection,
            path,
            project_type: project_type.into(),
        }
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// `None` until the project is saved somewhere.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    pub fn project_type(&self) -> &str {
        &self.project_type
    }
}

/// Collaborator owning open projects and their storage.
pub trait ProjectManager {
    fn load_project(&mut self, path: &Path) -> HubResult<ProjectId>;
    fn create_empty_project(&mut self) -> HubResult<ProjectId>;
    fn save_project(&mut self, project_id: ProjectId) -> HubResult<()>;
    /// Writes the project to `path`. Unless `as_copy`, the project then
    /// lives at `path` with `format`.
    fn save_project_as(
        &mut self,
        project_id: ProjectId,
        format: &str,
        path: &Path,
        as_copy: bool,
    ) -> HubResult<()>;
    fn close_project(&mut self, project_id: ProjectId) -> HubResult<()>;
    /// Open project ids in open order.
    fn project_id_list(&self) -> Vec<ProjectId>;
    fn project(&self, project_id: ProjectId) -> Option<&Project>;
    fn project_mut(&mut self, project_id: ProjectId) -> Option<&mut Project>;
}

/// SQLite-file project manager working on in-memory copies.
#[derive(Debug, Default)]
pub struct SqliteProjectManager {
    projects: Vec<Project>,
    next_id: ProjectId,
}

impl SqliteProjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> ProjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require(&self, project_id: ProjectId) -> HubResult<&Project> {
        self.project(project_id)
            .ok_or(HubError::ProjectNotFound(project_id))
    }
}

impl ProjectManager for SqliteProjectManager {
    fn load_project(&mut self, path: &Path) -> HubResult<ProjectId> {
        if !path.is_file() {
            return Err(HubError::PathInvalid(path.to_path_buf()));
        }
        let connection = load_db_into_memory(path).map_err(|err| HubError::db(None, err))?;

        let id = self.allocate_id();
        self.projects.push(Project::new(
            id,
            connection,
            Some(path.to_path_buf()),
            DEFAULT_PROJECT_TYPE,
        ));
        info!(
            "event=project_load module=service status=ok project_id={id} path={}",
            path.display()
        );
        Ok(id)
    }

    fn create_empty_project(&mut self) -> HubResult<ProjectId> {
        let connection = open_db_in_memory().map_err(|err| HubError::db(None, err))?;
        FieldStore::<ProjectField>::new(&connection)
            .set(
                PROJECT_ROW_ID,
                ProjectField::UniqueIdentifier,
                &FieldValue::Text(Uuid::new_v4().to_string()),
            )
            .map_err(|err| HubError::Manager {
                project_id: None,
                reason: err.to_string(),
            })?;

        let id = self.allocate_id();
        self.projects
            .push(Project::new(id, connection, None, DEFAULT_PROJECT_TYPE));
        info!("event=project_create module=service status=ok project_id={id}");
        Ok(id)
    }

    fn save_project(&mut self, project_id: ProjectId) -> HubResult<()> {
        let project = self.require(project_id)?;
        let path = project.path().ok_or(HubError::NoPath(project_id))?;
        save_db_to_file(project.connection(), path)
            .map_err(|err| HubError::db(Some(project_id), err))
    }

    fn save_project_as(
        &mut self,
        project_id: ProjectId,
        format: &str,
        path: &Path,
        as_copy: bool,
    ) -> HubResult<()> {
        let project = self.require(project_id)?;
        if format != DEFAULT_PROJECT_TYPE {
            return Err(HubError::Manager {
                project_id: Some(project_id),
                reason: format!("unsupported project format `{format}`"),
            });
        }
        check_save_path(path)?;
        save_db_to_file(project.connection(), path)
            .map_err(|err| HubError::db(Some(project_id), err))?;

        if !as_copy {
            if let Some(project) = self.project_mut(project_id) {
                project.path = Some(path.to_path_buf());
                project.project_type = format.to_string();
            }
        }
        Ok(())
    }

    fn close_project(&mut self, project_id: ProjectId) -> HubResult<()> {
        let position = self
            .projects
            .iter()
            .position(|project| project.id == project_id)
            .ok_or(HubError::ProjectNotFound(project_id))?;
        self.projects.remove(position);
        info!("event=project_close module=service status=ok project_id={project_id}");
        Ok(())
    }

    fn project_id_list(&self) -> Vec<ProjectId> {
        self.projects.iter().map(Project::id).collect()
    }

    fn project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == project_id)
    }

    fn project_mut(&mut self, project_id: ProjectId) -> Option<&mut Project> {
        self.projects
            .iter_mut()
            .find(|project| project.id == project_id)
    }
}

/// Checks that `path` can be written: its directory must exist, be a
/// directory and not be read-only.
pub fn check_save_path(path: &Path) -> HubResult<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !directory.exists() {
        return Err(HubError::PathInvalid(directory.to_path_buf()));
    }
    if !directory.is_dir() {
        return Err(HubError::PathNotDirectory(directory.to_path_buf()));
    }
    let metadata =
        std::fs::metadata(directory).map_err(|_| HubError::PathInvalid(directory.to_path_buf()))?;
    if metadata.permissions().readonly() {
        return Err(HubError::PathNotWritable(directory.to_path_buf()));
    }
    Ok(())
}
