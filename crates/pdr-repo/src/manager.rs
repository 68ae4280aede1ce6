use std::sync::Arc;

use chrono::{DateTime, Utc};
use pdr_chain::{replay, walk_history, ChainReport, CommitChain, CommitPayload, ReplayResult};
use pdr_crypto::VerifyingKey;
use pdr_store::{CommitBatch, DocumentIndex, InMemoryStore, RepoStore, Store};
use pdr_types::{
    format_timestamp, Did, Document, MonotonicClock, Repository, POST_KIND, POST_PATH_PREFIX,
};
use serde_json::json;

use crate::error::{RepoError, RepoResult};
use crate::locks::DidLocks;
use crate::summary::CommitSummary;

/// High-level PDR repository API.
///
/// All writes for one DID are serialized through [`DidLocks`], and each
/// write lands in the store through a single [`RepoStore::apply_commit`], so
/// a post is either fully recorded (document, commit, advanced head) or not
/// at all. Writers in other processes sharing the same database are caught
/// by the head check inside `apply_commit` and surface as a storage error.
pub struct RepositoryManager {
    store: Arc<dyn RepoStore>,
    chain: CommitChain,
    clock: MonotonicClock,
    locks: DidLocks,
}

impl RepositoryManager {
    pub fn new(store: Arc<dyn RepoStore>, chain: CommitChain) -> Self {
        Self {
            store,
            chain,
            clock: MonotonicClock::new(),
            locks: DidLocks::new(),
        }
    }

    /// Manager over a fresh in-memory store with the default chain.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), CommitChain::default())
    }

    // ---- Writes ----

    /// Create a post in `did`'s repository, creating the repository on first
    /// use.
    pub fn create_post(&self, did: &str, content: &str) -> RepoResult<Document> {
        let did = parse_did(did)?;
        if content.is_empty() {
            return Err(RepoError::Validation("content must not be empty".into()));
        }

        self.locks.with_lock(&did, || -> RepoResult<Document> {
            let now = self.clock.now();
            let repo = self.load_or_create(&did, now)?;

            let id = post_id(now);
            let value = json!({
                "text": content,
                "createdAt": format_timestamp(&now),
            });
            let payload = CommitPayload::create(id.clone(), value.clone());
            let commit = self.chain.build_payload_commit(&did, repo.head, &payload, now)?;
            let document = Document::new(did.clone(), id, POST_KIND, value, now);

            let updated = self.store.apply_commit(&CommitBatch {
                did: did.clone(),
                expected_head: repo.head,
                document: document.clone(),
                commit,
            })?;

            tracing::info!(
                %did,
                document = %document.id,
                head = %updated.head.short_hex(),
                "post created"
            );
            Ok(document)
        })
    }

    fn load_or_create(&self, did: &Did, now: DateTime<Utc>) -> RepoResult<Repository> {
        if let Some(repo) = self.store.get_repository(did)? {
            return Ok(repo);
        }
        let repo = self.store.ensure_repository(&Repository::new(did.clone(), now))?;
        tracing::info!(%did, "repository created");
        Ok(repo)
    }

    // ---- Reads ----

    /// Posts of `did`, newest first. A DID with no repository has no posts.
    pub fn list_posts(&self, did: &str) -> RepoResult<Vec<Document>> {
        let did = parse_did(did)?;
        let posts = self.store.get_documents_by_type(&did, POST_KIND)?;
        tracing::debug!(%did, count = posts.len(), "listed posts");
        Ok(posts)
    }

    pub fn get_post(&self, did: &str, id: &str) -> RepoResult<Document> {
        let did = parse_did(did)?;
        self.store
            .get_document(&did, id)?
            .filter(Document::is_post)
            .ok_or_else(|| RepoError::NotFound(format!("post {id} in {did}")))
    }

    pub fn repository(&self, did: &str) -> RepoResult<Repository> {
        let did = parse_did(did)?;
        self.store
            .get_repository(&did)?
            .ok_or_else(|| RepoError::NotFound(format!("repository {did}")))
    }

    pub fn list_repositories(&self) -> RepoResult<Vec<Did>> {
        Ok(self.store.list_repositories()?)
    }

    // ---- Provenance queries ----

    /// Up to `limit` commits of `did`, newest first.
    pub fn history(&self, did: &str, limit: usize) -> RepoResult<Vec<CommitSummary>> {
        self.history_of(&self.repository(did)?, limit)
    }

    /// Up to `limit` commits walked from `repo.head`, newest first.
    ///
    /// Commits are immutable, so the result matches the snapshot in `repo`
    /// even if the live head has since moved on.
    pub fn history_of(&self, repo: &Repository, limit: usize) -> RepoResult<Vec<CommitSummary>> {
        let summaries = walk_history(&*self.store, &repo.did, repo.head)
            .take(limit)
            .map(|item| item.map(|commit| CommitSummary::from(&commit)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Verify `did`'s chain. Signatures are checked when the manager signs
    /// commits itself.
    pub fn verify(&self, did: &str) -> RepoResult<ChainReport> {
        let key = self.chain.signer().map(|k| k.verifying_key());
        self.verify_with_key(did, key.as_ref())
    }

    /// Verify `did`'s chain, requiring every commit to be signed by `key`
    /// when one is given.
    pub fn verify_with_key(
        &self,
        did: &str,
        key: Option<&VerifyingKey>,
    ) -> RepoResult<ChainReport> {
        let repo = self.repository(did)?;
        Ok(self.chain.verify(&*self.store, &repo.did, key)?)
    }

    /// Rebuild `did`'s documents from its commit history alone.
    pub fn replay(&self, did: &str) -> RepoResult<ReplayResult> {
        let repo = self.repository(did)?;
        Ok(replay(&*self.store, &repo.did)?)
    }

    // ---- Accessors ----

    pub fn store(&self) -> &Arc<dyn RepoStore> {
        &self.store
    }

    pub fn chain(&self) -> &CommitChain {
        &self.chain
    }
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("chain", &self.chain)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

fn parse_did(did: &str) -> RepoResult<Did> {
    Did::parse(did).map_err(|e| RepoError::Validation(e.to_string()))
}

/// `post/<YYYYMMDDHHMMSS>.<micros>` in UTC.
fn post_id(now: DateTime<Utc>) -> String {
    format!("{POST_PATH_PREFIX}/{}", now.format("%Y%m%d%H%M%S%.6f"))
}
