use std::collections::HashSet;

use pdr_store::Store;
use pdr_types::{Commit, CommitId, Did};

use crate::error::{ChainError, ChainResult};

/// Lazy traversal of a commit chain from a head back to genesis.
///
/// Each step costs one [`Store::get_commit`]. The iterator yields commits
/// newest first and ends at the empty sentinel. A missing commit or a
/// revisited id yields a single [`ChainError::CorruptChain`], after which
/// the iterator is exhausted. Storage errors end it the same way.
pub struct History<'a, S: Store + ?Sized> {
    store: &'a S,
    did: Did,
    next: CommitId,
    seen: HashSet<CommitId>,
    done: bool,
}

/// Walk `did`'s chain starting at `from_head`.
pub fn walk_history<'a, S: Store + ?Sized>(
    store: &'a S,
    did: &Did,
    from_head: CommitId,
) -> History<'a, S> {
    History {
        store,
        did: did.clone(),
        next: from_head,
        seen: HashSet::new(),
        done: false,
    }
}

impl<S: Store + ?Sized> History<'_, S> {
    fn step(&mut self) -> ChainResult<Commit> {
        let id = self.next;
        if !self.seen.insert(id) {
            return Err(ChainError::cycle(&self.did, id));
        }
        let commit = self
            .store
            .get_commit(&self.did, &id)?
            .ok_or_else(|| ChainError::dangling(&self.did, id))?;
        self.next = commit.prev;
        Ok(commit)
    }
}

impl<S: Store + ?Sized> Iterator for History<'_, S> {
    type Item = ChainResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next.is_empty() {
            return None;
        }
        let item = self.step();
        if let Err(err) = &item {
            tracing::warn!(did = %self.did, error = %err, "history walk stopped");
            self.done = true;
        }
        Some(item)
    }
}
