//! Field schema: enumerated identifiers mapped to physical columns.
//!
//! # Responsibility
//! - Give each project table a field enum so callers get compile-time
//!   checked access while the store stays generic.
//! - Own the table/column spelling used by SQL built in `store`.
//!
//! # Invariants
//! - Every identifier maps to exactly one column of exactly one table.
//! - Column names must stay in sync with `db/migrations/*.sql`.

use super::value::FieldKind;
use serde::Serialize;
use std::fmt::Debug;

/// Project tables reachable through the field store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Project,
    Tree,
    Tag,
    TagRelationship,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Project => "tbl_project",
            Self::Tree => "tbl_tree",
            Self::Tag => "tbl_tag",
            Self::TagRelationship => "tbl_tag_relationship",
        }
    }

    /// Surrogate key column of the table.
    pub fn id_column(self) -> &'static str {
        match self {
            Self::Project => "l_project_id",
            Self::Tree => "l_tree_id",
            Self::Tag => "l_tag_id",
            Self::TagRelationship => "l_tag_relationship_id",
        }
    }
}

/// One addressable column of a given table.
pub trait Field: Copy + Debug {
    const TABLE: Table;

    fn column(self) -> &'static str;

    fn kind(self) -> FieldKind;
}

/// Row id of the single `tbl_project` row.
pub const PROJECT_ROW_ID: i64 = 1;

/// Scalar fields of `tbl_project`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectField {
    Name,
    SpellCheckLang,
    UniqueIdentifier,
    CreationDate,
    UpdateDate,
}

impl Field for ProjectField {
    const TABLE: Table = Table::Project;

    fn column(self) -> &'static str {
        match self {
            Self::Name => "t_project_name",
            Self::SpellCheckLang => "t_spell_check_lang",
            Self::UniqueIdentifier => "t_project_unique_identifier",
            Self::CreationDate => "dt_created",
            Self::UpdateDate => "dt_updated",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::SpellCheckLang | Self::UniqueIdentifier => FieldKind::Text,
            Self::CreationDate | Self::UpdateDate => FieldKind::Timestamp,
        }
    }
}

/// Fields of one `tbl_tree` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeField {
    Title,
    Label,
    Indent,
    SortOrder,
    Trashed,
    ProjectRoot,
    CharCount,
    WordCount,
    SynopsisNoteId,
    Content,
    CreationDate,
    UpdateDate,
    ContentDate,
}

impl Field for TreeField {
    const TABLE: Table = Table::Tree;

    fn column(self) -> &'static str {
        match self {
            Self::Title => "t_title",
            Self::Label => "t_label",
            Self::Indent => "l_indent",
            Self::SortOrder => "l_sort_order",
            Self::Trashed => "b_trashed",
            Self::ProjectRoot => "b_project_root",
            Self::CharCount => "l_char_count",
            Self::WordCount => "l_word_count",
            Self::SynopsisNoteId => "l_synopsis_note_id",
            Self::Content => "m_content",
            Self::CreationDate => "dt_created",
            Self::UpdateDate => "dt_updated",
            Self::ContentDate => "dt_content",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Title | Self::Label | Self::Content => FieldKind::Text,
            Self::Indent
            | Self::SortOrder
            | Self::CharCount
            | Self::WordCount
            | Self::SynopsisNoteId => FieldKind::Integer,
            Self::Trashed | Self::ProjectRoot => FieldKind::Bool,
            Self::CreationDate | Self::UpdateDate | Self::ContentDate => FieldKind::Timestamp,
        }
    }
}

/// Fields of one `tbl_tag` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagField {
    Name,
    Color,
    TextColor,
    CreationDate,
    UpdateDate,
}

impl Field for TagField {
    const TABLE: Table = Table::Tag;

    fn column(self) -> &'static str {
        match self {
            Self::Name => "t_name",
            Self::Color => "t_color",
            Self::TextColor => "t_text_color",
            Self::CreationDate => "dt_created",
            Self::UpdateDate => "dt_updated",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Name | Self::Color | Self::TextColor => FieldKind::Text,
            Self::CreationDate | Self::UpdateDate => FieldKind::Timestamp,
        }
    }
}

/// Fields of one `tbl_tag_relationship` link row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagRelationshipField {
    /// Linked tree item id.
    TreeCode,
    /// Linked tag id.
    TagCode,
    CreationDate,
}

impl Field for TagRelationshipField {
    const TABLE: Table = Table::TagRelationship;

    fn column(self) -> &'static str {
        match self {
            Self::TreeCode => "l_tree_code",
            Self::TagCode => "l_tag_code",
            Self::CreationDate => "dt_created",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::TreeCode | Self::TagCode => FieldKind::Integer,
            Self::CreationDate => FieldKind::Timestamp,
        }
    }
}
