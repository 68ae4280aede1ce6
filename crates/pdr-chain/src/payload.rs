use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChainResult;

/// Kind of mutation a commit records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Create,
}

/// The mutation carried in a commit's `data`.
///
/// Encoded as compact JSON with fields in the order `op`, `path`, `value`;
/// that byte string is what the commit id is computed over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub op: Op,
    pub path: String,
    pub value: Value,
}

impl CommitPayload {
    pub fn create(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: Op::Create,
            path: path.into(),
            value,
        }
    }

    /// Canonical encoding.
    pub fn to_bytes(&self) -> ChainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> ChainResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
