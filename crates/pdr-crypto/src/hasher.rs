use std::fmt;
use std::str::FromStr;

use pdr_types::CommitId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash function used to derive commit ids.
///
/// Both variants produce 256-bit digests. The algorithm is a property of a
/// deployment, not of individual commits: every commit in a store must be
/// hashed with the same algorithm for verification to be meaningful.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (default).
    #[default]
    Blake3,
    /// SHA-256, for stores whose existing commit ids were computed with it.
    Sha256,
}

impl HashAlgorithm {
    /// Compute the 32-byte digest of `data`.
    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Blake3 => *blake3::hash(data).as_bytes(),
            Self::Sha256 => {
                let out = Sha256::digest(data);
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&out);
                arr
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Content hasher for commit payloads.
///
/// The id of a commit is exactly `digest(payload_bytes)`: no domain tag, no
/// `prev` mixed in. Identical payloads therefore always produce identical ids,
/// regardless of when or where they are hashed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };
    pub const SHA256: Self = Self {
        algorithm: HashAlgorithm::Sha256,
    };

    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Hash raw payload bytes into a commit id.
    pub fn hash(&self, data: &[u8]) -> CommitId {
        CommitId::from_hash(self.algorithm.digest(data))
    }

    /// Verify that data produces the expected commit id.
    pub fn verify(&self, data: &[u8], expected: &CommitId) -> bool {
        self.hash(data) == *expected
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),
}
