#![allow(dead_code)]

use scriptorium_core::db::open_db_in_memory;
use scriptorium_core::{CoreEvent, HubError, HubResult, Project, ProjectId, ProjectManager};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

/// In-memory project manager with scripted failures.
#[derive(Debug, Default)]
pub struct FakeProjectManager {
    projects: Vec<Project>,
    next_id: ProjectId,
    failing_close: Vec<ProjectId>,
}

impl FakeProjectManager {
    /// Manager already holding projects with the given ids.
    pub fn with_projects(ids: &[ProjectId]) -> Self {
        let mut manager = Self::default();
        for id in ids {
            manager.insert(*id, None);
        }
        manager.next_id = ids.iter().max().map_or(0, |id| id + 1);
        manager
    }

    pub fn failing_close(mut self, project_id: ProjectId) -> Self {
        self.failing_close.push(project_id);
        self
    }

    fn insert(&mut self, id: ProjectId, path: Option<PathBuf>) {
        let connection = open_db_in_memory().unwrap();
        self.projects.push(Project::new(id, connection, path, "sqlite"));
    }

    fn allocate(&mut self, path: Option<PathBuf>) -> ProjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(id, path);
        id
    }
}

impl ProjectManager for FakeProjectManager {
    fn load_project(&mut self, path: &Path) -> HubResult<ProjectId> {
        Ok(self.allocate(Some(path.to_path_buf())))
    }

    fn create_empty_project(&mut self) -> HubResult<ProjectId> {
        Ok(self.allocate(None))
    }

    fn save_project(&mut self, project_id: ProjectId) -> HubResult<()> {
        let project = self
            .project(project_id)
            .ok_or(HubError::ProjectNotFound(project_id))?;
        match project.path() {
            Some(_) => Ok(()),
            None => Err(HubError::NoPath(project_id)),
        }
    }

    fn save_project_as(
        &mut self,
        project_id: ProjectId,
        _format: &str,
        path: &Path,
        as_copy: bool,
    ) -> HubResult<()> {
        let project = self
            .project_mut(project_id)
            .ok_or(HubError::ProjectNotFound(project_id))?;
        if !as_copy {
            project.set_path(Some(path.to_path_buf()));
        }
        Ok(())
    }

    fn close_project(&mut self, project_id: ProjectId) -> HubResult<()> {
        if self.failing_close.contains(&project_id) {
            return Err(HubError::Manager {
                project_id: Some(project_id),
                reason: "close refused".to_string(),
            });
        }
        let position = self
            .projects
            .iter()
            .position(|project| project.id() == project_id)
            .ok_or(HubError::ProjectNotFound(project_id))?;
        self.projects.remove(position);
        Ok(())
    }

    fn project_id_list(&self) -> Vec<ProjectId> {
        self.projects.iter().map(Project::id).collect()
    }

    fn project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id() == project_id)
    }

    fn project_mut(&mut self, project_id: ProjectId) -> Option<&mut Project> {
        self.projects
            .iter_mut()
            .find(|project| project.id() == project_id)
    }
}

/// Event names received so far, as serialized for observers.
pub fn event_names(receiver: &Receiver<CoreEvent>) -> Vec<String> {
    receiver
        .try_iter()
        .map(|event| {
            serde_json::to_value(&event).unwrap()["event"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect()
}
