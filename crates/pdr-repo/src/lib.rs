//! Repository manager for PDR.
//!
//! [`RepositoryManager`] is the entry point for applications embedding PDR.
//! It owns the store, the commit chain, and the per-DID writer locks, and
//! turns a post creation into one atomic document + commit + head update.

pub mod error;
pub mod locks;
pub mod manager;
pub mod summary;

pub use error::{RepoError, RepoResult};
pub use locks::DidLocks;
pub use manager::RepositoryManager;
pub use summary::CommitSummary;

// Re-export key types
pub use pdr_chain::{ChainReport, CommitChain, ReplayResult, Violation, ViolationKind};
pub use pdr_store::{InMemoryStore, RepoStore, SqliteStore};
pub use pdr_types::{CommitId, Did, Document, Repository, POST_KIND};
