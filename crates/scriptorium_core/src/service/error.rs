//! Service-level error type shared by the registry and the hubs.

use crate::cache::CacheError;
use crate::db::DbError;
use crate::model::schema::Table;
use crate::model::{ItemId, ProjectId, RowId, TagId};
use crate::repo::RepoError;
use crate::store::StoreError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type HubResult<T> = Result<T, HubError>;

/// Errors surfaced by registry and hub operations.
///
/// Every variant carries the ids needed to build a user-facing message and
/// maps to a stable reason key through [`HubError::code`].
#[derive(Debug)]
pub enum HubError {
    ProjectNotFound(ProjectId),
    /// Project was never saved and has no path to save to.
    NoPath(ProjectId),
    RowNotFound {
        project_id: ProjectId,
        table: Table,
        row_id: RowId,
    },
    RelationshipNotFound {
        project_id: ProjectId,
        item_id: ItemId,
        tag_id: TagId,
    },
    /// Input rejected before any write; `reason` doubles as the code.
    ValidationFailed {
        project_id: ProjectId,
        reason: &'static str,
    },
    PathInvalid(PathBuf),
    PathNotDirectory(PathBuf),
    PathNotWritable(PathBuf),
    /// A write or commit failed and was rolled back.
    TransactionFailed {
        project_id: ProjectId,
        source: StoreError,
    },
    TypeMismatch {
        project_id: ProjectId,
        source: StoreError,
    },
    Cache {
        project_id: ProjectId,
        source: CacheError,
    },
    Db {
        project_id: Option<ProjectId>,
        source: DbError,
    },
    /// The project manager refused an operation for its own reasons.
    Manager {
        project_id: Option<ProjectId>,
        reason: String,
    },
}

impl HubError {
    /// Stable machine-readable reason key.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "project_not_found",
            Self::NoPath(_) | Self::PathInvalid(_) => "path_dont_exist",
            Self::RowNotFound { .. } => "row_not_found",
            Self::RelationshipNotFound { .. } => "no_tag_relationship_to_remove",
            Self::ValidationFailed { reason, .. } => *reason,
            Self::PathNotDirectory(_) => "path_not_a_directory",
            Self::PathNotWritable(_) => "path_not_writable",
            Self::TransactionFailed { .. } => "transaction_failed",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Cache { source, .. } => match source {
                CacheError::Store(err) => err.code(),
                CacheError::IndexOutOfRange { .. } | CacheError::ChildOutOfRange { .. } => {
                    "index_out_of_range"
                }
            },
            Self::Db { .. } => "db_error",
            Self::Manager { .. } => "project_manager_failed",
        }
    }

    /// Project the error is about, when there is one.
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::ProjectNotFound(project_id) | Self::NoPath(project_id) => Some(*project_id),
            Self::RowNotFound { project_id, .. }
            | Self::RelationshipNotFound { project_id, .. }
            | Self::ValidationFailed { project_id, .. }
            | Self::TransactionFailed { project_id, .. }
            | Self::TypeMismatch { project_id, .. }
            | Self::Cache { project_id, .. } => Some(*project_id),
            Self::Db { project_id, .. } | Self::Manager { project_id, .. } => *project_id,
            Self::PathInvalid(_) | Self::PathNotDirectory(_) | Self::PathNotWritable(_) => None,
        }
    }

    /// Attaches a project id to a store failure.
    pub fn store(project_id: ProjectId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, row_id } => Self::RowNotFound {
                project_id,
                table,
                row_id,
            },
            StoreError::TypeMismatch { .. } => Self::TypeMismatch {
                project_id,
                source: err,
            },
            StoreError::TransactionFailed { .. } => Self::TransactionFailed {
                project_id,
                source: err,
            },
            StoreError::Db(source) => Self::Db {
                project_id: Some(project_id),
                source,
            },
        }
    }

    /// Attaches a project id to a repository failure.
    pub fn repo(project_id: ProjectId, err: RepoError) -> Self {
        match err {
            RepoError::Store(err) => Self::store(project_id, err),
            RepoError::RelationshipNotFound { item_id, tag_id } => Self::RelationshipNotFound {
                project_id,
                item_id,
                tag_id,
            },
        }
    }

    pub fn cache(project_id: ProjectId, err: CacheError) -> Self {
        match err {
            CacheError::Store(err) => Self::store(project_id, err),
            other => Self::Cache {
                project_id,
                source: other,
            },
        }
    }

    pub fn db(project_id: Option<ProjectId>, err: impl Into<DbError>) -> Self {
        Self::Db {
            project_id,
            source: err.into(),
        }
    }
}

impl Display for HubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(project_id) => write!(f, "project {project_id} not found"),
            Self::NoPath(project_id) => write!(f, "project {project_id} has no path"),
            Self::RowNotFound {
                project_id,
                table,
                row_id,
            } => write!(
                f,
                "row {row_id} not found in {} of project {project_id}",
                table.name()
            ),
            Self::RelationshipNotFound {
                project_id,
                item_id,
                tag_id,
            } => write!(
                f,
                "no relationship between item {item_id} and tag {tag_id} in project {project_id}"
            ),
            Self::ValidationFailed { project_id, reason } => {
                write!(f, "validation failed in project {project_id}: {reason}")
            }
            Self::PathInvalid(path) => write!(f, "path does not exist: {}", path.display()),
            Self::PathNotDirectory(path) => {
                write!(f, "path is not a directory: {}", path.display())
            }
            Self::PathNotWritable(path) => write!(f, "path is not writable: {}", path.display()),
            Self::TransactionFailed { project_id, source } => {
                write!(f, "project {project_id}: {source}")
            }
            Self::TypeMismatch { project_id, source } => {
                write!(f, "project {project_id}: {source}")
            }
            Self::Cache { project_id, source } => write!(f, "project {project_id}: {source}"),
            Self::Db { project_id, source } => match project_id {
                Some(project_id) => write!(f, "project {project_id}: {source}"),
                None => write!(f, "{source}"),
            },
            Self::Manager { project_id, reason } => match project_id {
                Some(project_id) => write!(f, "project {project_id}: {reason}"),
                None => write!(f, "{reason}"),
            },
        }
    }
}

impl Error for HubError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TransactionFailed { source, .. } | Self::TypeMismatch { source, .. } => {
                Some(source)
            }
            Self::Cache { source, .. } => Some(source),
            Self::Db { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Copy of the most recent error seen by a read accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastError {
    pub code: &'static str,
    pub project_id: Option<ProjectId>,
    pub message: String,
}

impl From<&HubError> for LastError {
    fn from(value: &HubError) -> Self {
        Self {
            code: value.code(),
            project_id: value.project_id(),
            message: value.to_string(),
        }
    }
}
