//! Cacheable roles of one tree item.

use super::schema::TreeField;
use serde::Serialize;

/// Enumerated field identifier used by the tree item cache.
///
/// Stored roles map to a `TreeField`; the rest are answered from the item
/// itself or derived from the ordered item sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    ProjectId,
    ItemId,
    Name,
    Label,
    Indent,
    SortOrder,
    Trashed,
    CreationDate,
    UpdateDate,
    ContentDate,
    HasChildren,
    CharCount,
    WordCount,
    SynopsisNoteId,
}

impl ItemRole {
    pub const ALL: [ItemRole; 14] = [
        Self::ProjectId,
        Self::ItemId,
        Self::Name,
        Self::Label,
        Self::Indent,
        Self::SortOrder,
        Self::Trashed,
        Self::CreationDate,
        Self::UpdateDate,
        Self::ContentDate,
        Self::HasChildren,
        Self::CharCount,
        Self::WordCount,
        Self::SynopsisNoteId,
    ];

    /// Column backing this role, `None` for structural and derived roles.
    pub fn tree_field(self) -> Option<TreeField> {
        match self {
            Self::Name => Some(TreeField::Title),
            Self::Label => Some(TreeField::Label),
            Self::Trashed => Some(TreeField::Trashed),
            Self::CreationDate => Some(TreeField::CreationDate),
            Self::UpdateDate => Some(TreeField::UpdateDate),
            Self::ContentDate => Some(TreeField::ContentDate),
            Self::CharCount => Some(TreeField::CharCount),
            Self::WordCount => Some(TreeField::WordCount),
            Self::SynopsisNoteId => Some(TreeField::SynopsisNoteId),
            Self::ProjectId
            | Self::ItemId
            | Self::Indent
            | Self::SortOrder
            | Self::HasChildren => None,
        }
    }

    /// Role whose cached value goes stale when `field` is written.
    pub fn for_field(field: TreeField) -> Option<ItemRole> {
        Self::ALL
            .into_iter()
            .find(|role| role.tree_field() == Some(field))
    }
}
