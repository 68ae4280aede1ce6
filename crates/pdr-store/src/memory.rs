use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use pdr_types::{Commit, CommitId, Did, Document, Repository};

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_batch, CommitBatch, DocumentIndex, RepoStore, Store};

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding. The three keyspaces sit behind a single
/// `RwLock`, which makes [`RepoStore::apply_commit`] atomic: the head check
/// and all three writes happen under one write guard. Nothing survives a
/// process restart.
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    repositories: HashMap<Did, Repository>,
    commits: HashMap<Did, HashMap<CommitId, Commit>>,
    documents: HashMap<Did, HashMap<String, Document>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn upsert_repository(&mut self, repo: &Repository) {
        self.repositories
            .entry(repo.did.clone())
            .and_modify(|existing| {
                existing.head = repo.head;
                existing.updated_at = repo.updated_at;
            })
            .or_insert_with(|| repo.clone());
    }

    fn insert_document(&mut self, doc: &Document) -> StoreResult<()> {
        let docs = self.documents.entry(doc.repository_did.clone()).or_default();
        if docs.contains_key(&doc.id) {
            return Err(StoreError::Constraint(format!(
                "document ({}, {}) already exists",
                doc.repository_did, doc.id
            )));
        }
        docs.insert(doc.id.clone(), doc.clone());
        Ok(())
    }
}

impl Store for InMemoryStore {
    fn get_repository(&self, did: &Did) -> StoreResult<Option<Repository>> {
        Ok(self.read()?.repositories.get(did).cloned())
    }

    fn save_repository(&self, repo: &Repository) -> StoreResult<()> {
        self.write()?.upsert_repository(repo);
        Ok(())
    }

    fn ensure_repository(&self, repo: &Repository) -> StoreResult<Repository> {
        let mut state = self.write()?;
        Ok(state
            .repositories
            .entry(repo.did.clone())
            .or_insert_with(|| repo.clone())
            .clone())
    }

    fn get_commit(&self, did: &Did, id: &CommitId) -> StoreResult<Option<Commit>> {
        let state = self.read()?;
        Ok(state.commits.get(did).and_then(|c| c.get(id)).cloned())
    }

    fn save_commit(&self, did: &Did, commit: &Commit) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.repositories.contains_key(did) {
            return Err(StoreError::RepositoryNotFound(did.clone()));
        }
        state
            .commits
            .entry(did.clone())
            .or_default()
            .entry(commit.id)
            .or_insert_with(|| commit.clone());
        Ok(())
    }

    fn count_commits(&self, did: &Did) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state.commits.get(did).map_or(0, |c| c.len() as u64))
    }

    fn list_repositories(&self) -> StoreResult<Vec<Did>> {
        let state = self.read()?;
        let mut dids: Vec<Did> = state.repositories.keys().cloned().collect();
        dids.sort();
        Ok(dids)
    }
}

impl DocumentIndex for InMemoryStore {
    fn create_document(&self, doc: &Document) -> StoreResult<()> {
        self.write()?.insert_document(doc)
    }

    fn get_document(&self, did: &Did, id: &str) -> StoreResult<Option<Document>> {
        let state = self.read()?;
        Ok(state.documents.get(did).and_then(|d| d.get(id)).cloned())
    }

    fn get_documents_by_type(&self, did: &Did, kind: &str) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        let mut docs: Vec<Document> = state
            .documents
            .get(did)
            .map(|d| d.values().filter(|doc| doc.kind == kind).cloned().collect())
            .unwrap_or_default();
        docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(docs)
    }
}

impl RepoStore for InMemoryStore {
    fn apply_commit(&self, batch: &CommitBatch) -> StoreResult<Repository> {
        validate_batch(batch)?;
        let mut state = self.write()?;

        let current = state
            .repositories
            .get(&batch.did)
            .map(|r| r.head)
            .ok_or_else(|| StoreError::RepositoryNotFound(batch.did.clone()))?;
        if current != batch.expected_head {
            tracing::warn!(
                did = %batch.did,
                expected = ?batch.expected_head,
                actual = ?current,
                "head moved, rejecting commit"
            );
            return Err(StoreError::HeadConflict {
                did: batch.did.clone(),
                expected: batch.expected_head,
                actual: current,
            });
        }

        // Every check happens before the first write so a rejected batch
        // leaves all three keyspaces untouched.
        let doc_exists = state
            .documents
            .get(&batch.did)
            .is_some_and(|d| d.contains_key(&batch.document.id));
        if doc_exists {
            return Err(StoreError::Constraint(format!(
                "document ({}, {}) already exists",
                batch.did, batch.document.id
            )));
        }
        let commit_exists = state
            .commits
            .get(&batch.did)
            .is_some_and(|c| c.contains_key(&batch.commit.id));
        if commit_exists {
            return Err(StoreError::Constraint(format!(
                "commit {} already exists for {}",
                batch.commit.id, batch.did
            )));
        }

        state.insert_document(&batch.document)?;
        state
            .commits
            .entry(batch.did.clone())
            .or_default()
            .insert(batch.commit.id, batch.commit.clone());

        let repo = state
            .repositories
            .get_mut(&batch.did)
            .ok_or_else(|| StoreError::RepositoryNotFound(batch.did.clone()))?;
        repo.head = batch.commit.id;
        repo.updated_at = batch.commit.created_at.max(repo.updated_at);

        tracing::debug!(did = %batch.did, head = %batch.commit.id.short_hex(), "applied commit");
        Ok(repo.clone())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let repositories = self.read().map(|s| s.repositories.len()).unwrap_or(0);
        f.debug_struct("InMemoryStore")
            .field("repository_count", &repositories)
            .finish()
    }
}
