//! Typed data model shared by the store, the cache and the hubs.
//!
//! # Responsibility
//! - Define the dynamic value type read from and written to project tables.
//! - Map enumerated field identifiers to table/column names and kinds.
//! - Enumerate the cacheable roles of one tree item.
//!
//! # Invariants
//! - Column names are only spelled out in `schema`; callers go through the
//!   field enums.

pub mod role;
pub mod schema;
pub mod value;

/// Opaque id of one open project, allocated by the project manager.
pub type ProjectId = u32;

/// Row key inside one project table.
pub type RowId = i64;

/// Row key of a `tbl_tree` item.
pub type ItemId = RowId;

/// Row key of a `tbl_tag` tag.
pub type TagId = RowId;
