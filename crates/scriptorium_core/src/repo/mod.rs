//! Repository layer built on top of the field store.
//!
//! # Responsibility
//! - Own multi-row use cases (relationship find-or-create, ordered tree
//!   listing, sort-order renumbering).
//! - Keep SQL details out of the service layer.
//!
//! # Invariants
//! - Every multi-row write runs inside one `FieldStore::with_transaction`.
//! - Repository APIs return semantic errors (`RelationshipNotFound`) in
//!   addition to store errors.

use crate::db::DbError;
use crate::model::{ItemId, TagId};
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod relationship_repo;
pub mod tree_repo;

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    /// No relationship row links this pair.
    RelationshipNotFound { item_id: ItemId, tag_id: TagId },
}

impl RepoError {
    /// Stable machine-readable reason key.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::RelationshipNotFound { .. } => "no_tag_relationship_to_remove",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::RelationshipNotFound { item_id, tag_id } => {
                write!(f, "no relationship between item {item_id} and tag {tag_id}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::RelationshipNotFound { .. } => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::Db(DbError::Sqlite(value)))
    }
}
