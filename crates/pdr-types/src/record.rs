use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commit_id::CommitId;
use crate::did::Did;

/// Document kind of a feed post.
pub const POST_KIND: &str = "app.bsky.feed.post";

/// Path prefix of post document ids (`post/<timestamp>`).
pub const POST_PATH_PREFIX: &str = "post";

/// Per-identity aggregate: a head pointer plus timestamps.
///
/// Commits and documents are owned by reference (keyed by `did`) and live in
/// their own keyspaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub did: Did,
    /// Most recent commit, or [`CommitId::EMPTY`] before the first commit.
    pub head: CommitId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// A fresh repository with an empty head.
    pub fn new(did: Did, now: DateTime<Utc>) -> Self {
        Self {
            did,
            head: CommitId::EMPTY,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` once at least one commit has been linked.
    pub fn has_history(&self) -> bool {
        !self.head.is_empty()
    }
}

/// Immutable, content-addressed record of one mutation.
///
/// `id` is always the hash of `data`; `prev` links to the previous head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: CommitId,
    pub repository_did: Did,
    pub prev: CommitId,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(default, with = "hex_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl Commit {
    /// Returns `true` for the first commit of a chain.
    pub fn is_genesis(&self) -> bool {
        self.prev.is_empty()
    }

    /// Decode `data` as JSON, if it is JSON.
    pub fn payload_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.data).ok()
    }
}

/// Typed record materialized by a commit.
///
/// Keyed by `(repository_did, id)`; stored independently of the commit chain
/// for fast lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub repository_did: Did,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        repository_did: Did,
        id: impl Into<String>,
        kind: impl Into<String>,
        value: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            repository_did,
            kind: kind.into(),
            value,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_post(&self) -> bool {
        self.kind == POST_KIND
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| hex::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
