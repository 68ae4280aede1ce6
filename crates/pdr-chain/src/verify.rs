use pdr_crypto::{Signature, VerifyingKey};
use pdr_store::{Store, StoreError};
use pdr_types::{CommitId, Did};
use serde::Serialize;

use crate::chain::CommitChain;
use crate::error::{ChainError, ChainResult};
use crate::history::walk_history;

/// Result of verifying one repository's commit chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub did: Did,
    pub head: CommitId,
    /// Commits reached by following `prev` from `head`.
    pub commits_walked: u64,
    /// Commits the store holds for this DID.
    pub commits_stored: u64,
    pub violations: Vec<Violation>,
}

impl ChainReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub commit: CommitId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    /// `id` is not the hash of `data`.
    HashMismatch,
    /// The walk hit a missing commit or a cycle.
    BrokenLink,
    /// A verifying key was supplied and the signature is absent or invalid.
    BadSignature,
    /// Stored commits not reachable from `head`.
    UnreachableCommits,
}

impl CommitChain {
    /// Verify `did`'s chain end to end.
    ///
    /// Walks from the stored head and checks every commit's id against the
    /// hash of its data. With `key`, every commit must also carry a valid
    /// signature over its id. Finally the number of commits walked must
    /// equal the number stored. Integrity problems are collected as
    /// [`Violation`]s; only storage failures are returned as errors.
    pub fn verify<S: Store + ?Sized>(
        &self,
        store: &S,
        did: &Did,
        key: Option<&VerifyingKey>,
    ) -> ChainResult<ChainReport> {
        let repo = store
            .get_repository(did)?
            .ok_or_else(|| StoreError::RepositoryNotFound(did.clone()))?;
        let mut violations = Vec::new();
        let mut walked = 0u64;

        for item in walk_history(store, did, repo.head) {
            let commit = match item {
                Ok(commit) => commit,
                Err(ChainError::CorruptChain { commit, reason, .. }) => {
                    violations.push(Violation {
                        commit,
                        kind: ViolationKind::BrokenLink,
                        description: reason,
                    });
                    break;
                }
                Err(err) => return Err(err),
            };
            walked += 1;

            if !self.hasher().verify(&commit.data, &commit.id) {
                violations.push(Violation {
                    commit: commit.id,
                    kind: ViolationKind::HashMismatch,
                    description: format!(
                        "data hashes to {} under {}",
                        self.hasher().hash(&commit.data),
                        self.hasher().algorithm()
                    ),
                });
            }

            if let Some(key) = key {
                let verdict = match commit.signature.as_deref() {
                    None => Err("commit is unsigned".to_string()),
                    Some(bytes) => Signature::from_slice(bytes)
                        .and_then(|sig| key.verify_commit(&commit.id, &sig))
                        .map_err(|e| e.to_string()),
                };
                if let Err(description) = verdict {
                    violations.push(Violation {
                        commit: commit.id,
                        kind: ViolationKind::BadSignature,
                        description,
                    });
                }
            }
        }

        let stored = store.count_commits(did)?;
        if stored != walked {
            violations.push(Violation {
                commit: repo.head,
                kind: ViolationKind::UnreachableCommits,
                description: format!("walked {walked} commits, store holds {stored}"),
            });
        }

        if violations.is_empty() {
            tracing::debug!(%did, commits = walked, "chain verified");
        } else {
            tracing::warn!(%did, violations = violations.len(), "chain verification failed");
        }

        Ok(ChainReport {
            did: did.clone(),
            head: repo.head,
            commits_walked: walked,
            commits_stored: stored,
            violations,
        })
    }
}
