use pdr_types::{Commit, CommitId, Did, Document, Repository};

use crate::error::StoreResult;

/// Persistence for repositories and their commits.
///
/// All implementations must satisfy these invariants:
/// - Missing records are `Ok(None)`, never an error.
/// - Commits are immutable: saving a commit whose id already exists for the
///   same DID is a no-op.
/// - Commits can only be saved under an existing repository.
pub trait Store: Send + Sync {
    /// Read a repository by DID.
    fn get_repository(&self, did: &Did) -> StoreResult<Option<Repository>>;

    /// Upsert a repository: insert if absent, otherwise update `head` and
    /// `updated_at` (the stored `created_at` is kept).
    fn save_repository(&self, repo: &Repository) -> StoreResult<()>;

    /// Insert `repo` unless its DID already exists; return the stored row.
    ///
    /// Unlike [`Store::save_repository`] this never rewinds an existing head.
    fn ensure_repository(&self, repo: &Repository) -> StoreResult<Repository>;

    /// Read a commit of the given repository.
    fn get_commit(&self, did: &Did, id: &CommitId) -> StoreResult<Option<Commit>>;

    /// Persist a commit under `did`.
    fn save_commit(&self, did: &Did, commit: &Commit) -> StoreResult<()>;

    /// Number of commits stored for `did`.
    fn count_commits(&self, did: &Did) -> StoreResult<u64>;

    /// All known repository DIDs, sorted.
    fn list_repositories(&self) -> StoreResult<Vec<Did>>;
}

/// Keyed document storage, independent of the commit keyspace.
pub trait DocumentIndex: Send + Sync {
    /// Insert a document. A duplicate `(repository_did, id)` is
    /// [`crate::StoreError::Constraint`].
    fn create_document(&self, doc: &Document) -> StoreResult<()>;

    fn get_document(&self, did: &Did, id: &str) -> StoreResult<Option<Document>>;

    /// Documents of one kind, newest first (ties broken by id, descending).
    fn get_documents_by_type(&self, did: &Did, kind: &str) -> StoreResult<Vec<Document>>;
}

/// Everything one mutation writes.
#[derive(Clone, Debug)]
pub struct CommitBatch {
    pub did: Did,
    /// Head the commit was built on; the write is rejected if it moved.
    pub expected_head: CommitId,
    pub document: Document,
    pub commit: Commit,
}

/// A store that can apply a whole mutation atomically.
pub trait RepoStore: Store + DocumentIndex {
    /// Atomically insert `batch.document` and `batch.commit` and advance the
    /// repository head to `batch.commit.id`.
    ///
    /// Fails without writing anything when:
    /// - the repository does not exist ([`crate::StoreError::RepositoryNotFound`]),
    /// - the stored head differs from `expected_head`
    ///   ([`crate::StoreError::HeadConflict`]),
    /// - the batch is inconsistent or a key already exists
    ///   ([`crate::StoreError::Constraint`]).
    ///
    /// Returns the repository as stored after the update.
    fn apply_commit(&self, batch: &CommitBatch) -> StoreResult<Repository>;
}

/// Checks shared by every backing before `apply_commit` touches storage.
pub(crate) fn validate_batch(batch: &CommitBatch) -> StoreResult<()> {
    use crate::error::StoreError;

    if batch.document.repository_did != batch.did {
        return Err(StoreError::Constraint(format!(
            "document belongs to {}, batch targets {}",
            batch.document.repository_did, batch.did
        )));
    }
    if batch.commit.repository_did != batch.did {
        return Err(StoreError::Constraint(format!(
            "commit belongs to {}, batch targets {}",
            batch.commit.repository_did, batch.did
        )));
    }
    if batch.commit.prev != batch.expected_head {
        return Err(StoreError::Constraint(format!(
            "commit prev {:?} does not match expected head {:?}",
            batch.commit.prev, batch.expected_head
        )));
    }
    if batch.commit.id.is_empty() {
        return Err(StoreError::Constraint("commit id is the empty sentinel".into()));
    }
    Ok(())
}
