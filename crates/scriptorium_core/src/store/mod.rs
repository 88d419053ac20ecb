//! Field-level access to project tables.
//!
//! # Responsibility
//! - Read and write single columns of single rows with explicit transactions.
//! - Expose the filtered lookup used by relationship and tag queries.
//!
//! # Invariants
//! - No caching and no notifications happen at this layer.
//! - A failed write inside a transaction is always followed by a rollback
//!   before the error leaves `with_transaction`.

mod field_store;

pub use field_store::{Column, FieldStore, StoreError, StoreResult};
