//! Storage for PDR repositories, commits, and documents.
//!
//! Three keyspaces are kept per repository owner (DID): the repository row
//! (head pointer), the commits, and the documents. Documents live in their own
//! keyspace so reads never touch the commit chain.
//!
//! # Traits
//!
//! - [`Store`] -- repositories and commits
//! - [`DocumentIndex`] -- documents keyed by `(did, id)`, queryable by type
//! - [`RepoStore`] -- both, plus the atomic [`RepoStore::apply_commit`]
//!
//! # Storage Backends
//!
//! - [`InMemoryStore`] -- `HashMap` arena for tests and embedding
//! - [`SqliteStore`] -- durable relational backing
//!
//! # Design Rules
//!
//! 1. Both backings are observably identical for every trait operation.
//! 2. Commits are immutable; re-saving an existing commit id is a no-op.
//! 3. A duplicate document key is a constraint violation, never an overwrite.
//! 4. `apply_commit` writes document, commit, and head as one unit, and only
//!    if the stored head still equals the caller's expected head.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod contract;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CommitBatch, DocumentIndex, RepoStore, Store};
