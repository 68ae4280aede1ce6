use pdr_store::StoreError;
use pdr_types::{CommitId, Did};

/// Errors produced by commit chain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Following `prev` links hit a missing commit or revisited one.
    #[error("corrupt chain for {did} at {commit:?}: {reason}")]
    CorruptChain {
        did: Did,
        commit: CommitId,
        reason: String,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError {
    pub(crate) fn dangling(did: &Did, commit: CommitId) -> Self {
        Self::CorruptChain {
            did: did.clone(),
            commit,
            reason: "commit referenced by chain is missing".into(),
        }
    }

    pub(crate) fn cycle(did: &Did, commit: CommitId) -> Self {
        Self::CorruptChain {
            did: did.clone(),
            commit,
            reason: "commit visited twice".into(),
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
