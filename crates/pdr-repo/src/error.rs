use pdr_chain::ChainError;
use pdr_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// Any storage failure, including constraint violations and head
    /// conflicts.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("corrupt chain: {0}")]
    CorruptChain(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl RepoError {
    /// Short machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Validation(_) => "ValidationError",
            Self::Storage(e) if e.is_conflict() => "HeadConflict",
            Self::Storage(_) => "StorageError",
            Self::CorruptChain(_) => "CorruptChain",
            Self::Encoding(_) => "EncodingError",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_conflict())
    }
}

impl From<ChainError> for RepoError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Store(StoreError::RepositoryNotFound(did)) => {
                Self::NotFound(format!("repository {did}"))
            }
            ChainError::Store(e) => Self::Storage(e),
            e @ ChainError::CorruptChain { .. } => Self::CorruptChain(e.to_string()),
            ChainError::Encoding(msg) => Self::Encoding(msg),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
