use std::collections::BTreeMap;

use pdr_store::{Store, StoreError};
use pdr_types::Did;
use serde::Serialize;
use serde_json::Value;

use crate::error::ChainResult;
use crate::history::walk_history;
use crate::payload::{CommitPayload, Op};

/// Document state reconstructed purely from commit history.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayResult {
    pub did: Did,
    pub applied_commits: u64,
    /// Document path to value.
    pub state: BTreeMap<String, Value>,
}

/// Replay `did`'s chain from genesis to head.
///
/// The walk runs head-to-genesis, so commits are collected first and
/// applied oldest first. Any corrupt link or undecodable payload aborts the
/// replay.
pub fn replay<S: Store + ?Sized>(store: &S, did: &Did) -> ChainResult<ReplayResult> {
    let repo = store
        .get_repository(did)?
        .ok_or_else(|| StoreError::RepositoryNotFound(did.clone()))?;
    let commits = walk_history(store, did, repo.head).collect::<ChainResult<Vec<_>>>()?;

    let mut state = BTreeMap::new();
    for commit in commits.iter().rev() {
        let payload = CommitPayload::from_bytes(&commit.data)?;
        match payload.op {
            Op::Create => {
                state.insert(payload.path, payload.value);
            }
        }
    }

    Ok(ReplayResult {
        did: did.clone(),
        applied_commits: commits.len() as u64,
        state,
    })
}
