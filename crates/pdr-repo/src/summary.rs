use chrono::{DateTime, Utc};
use pdr_chain::CommitPayload;
use pdr_types::{Commit, CommitId};
use serde::Serialize;

/// Condensed view of one commit for history listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub id: CommitId,
    pub prev: CommitId,
    /// `op` of the decoded payload, if the data is a known payload.
    pub op: Option<String>,
    /// Document path the commit wrote, if known.
    pub path: Option<String>,
    pub signed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Commit> for CommitSummary {
    fn from(commit: &Commit) -> Self {
        let payload = CommitPayload::from_bytes(&commit.data).ok();
        Self {
            id: commit.id,
            prev: commit.prev,
            op: payload
                .as_ref()
                .and_then(|p| serde_json::to_value(p.op).ok())
                .and_then(|v| v.as_str().map(str::to_owned)),
            path: payload.map(|p| p.path),
            signed: commit.signature.is_some(),
            created_at: commit.created_at,
        }
    }
}
