//! Project-level use-cases.
//!
//! # Responsibility
//! - Own the set of open projects (`ProjectRegistry`) and their storage
//!   (`ProjectManager`).
//! - Expose tag and tree use-cases as hubs borrowed from the registry.
//! - Keep GUI/CLI layers decoupled from storage details.

pub mod error;
pub mod project_manager;
pub mod project_registry;
pub mod tag_hub;
pub mod tree_hub;
pub mod word_meter;
