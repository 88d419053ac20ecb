//! Core data layer for Scriptorium writing projects.
//! This crate is the single source of truth for project, tree and tag invariants.

pub mod cache;
pub mod db;
pub mod event;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use cache::{CacheError, ItemFieldSource, TreeItem, TreeItemCache};
pub use event::{CoreEvent, EventBus};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::role::ItemRole;
pub use model::schema::{Field, ProjectField, Table, TagField, TagRelationshipField, TreeField};
pub use model::value::{FieldKind, FieldValue};
pub use model::{ItemId, ProjectId, RowId, TagId};
pub use repo::relationship_repo::RelationshipManager;
pub use repo::tree_repo::{SqliteTreeRepository, TreeRepository, TreeRow};
pub use repo::{RepoError, RepoResult};
pub use service::error::{HubError, HubResult, LastError};
pub use service::project_manager::{Project, ProjectManager, SqliteProjectManager};
pub use service::project_registry::{ProjectRegistry, ProjectTemplate};
pub use service::tag_hub::TagHub;
pub use service::tree_hub::TreeHub;
pub use service::word_meter::{TextCounts, WordCountReport, WordMeter};
pub use store::{Column, FieldStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
