use pdr_types::{CommitId, Did, TypeError};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The repository the operation targets does not exist.
    #[error("repository not found: {0}")]
    RepositoryNotFound(Did),

    /// A uniqueness or integrity constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The stored head moved since the caller read it.
    #[error("head conflict for {did}: expected {expected:?}, found {actual:?}")]
    HeadConflict {
        did: Did,
        expected: CommitId,
        actual: CommitId,
    },

    /// Failure reported by the database engine.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted row could not be decoded.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns `true` for [`StoreError::HeadConflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::HeadConflict { .. })
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::CorruptRow(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
