use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque identifier of a repository owner.
///
/// PDR never interprets the contents of a DID; the only requirement is that
/// it is non-empty. Two DIDs are the same repository iff their strings are
/// byte-equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and validate a DID.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeError::InvalidDid("DID must not be empty".into()));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Did {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_plc_did() {
        let did = Did::parse("did:plc:abc123").unwrap();
        assert_eq!(did.as_str(), "did:plc:abc123");
        assert_eq!(format!("{did}"), "did:plc:abc123");
    }

    #[test]
    fn parse_is_opaque() {
        assert!(Did::parse("alice").is_ok());
        // no trimming or normalisation: these are three distinct owners
        let spaced = Did::parse("did:plc: abc").unwrap();
        let padded = Did::parse(" did:plc:abc").unwrap();
        assert_ne!(spaced, padded);
        assert_ne!(padded, Did::parse("did:plc:abc").unwrap());
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(matches!(Did::parse(""), Err(TypeError::InvalidDid(_))));
    }

    #[test]
    fn serde_is_transparent_string() {
        let did = Did::parse("did:web:example.com").unwrap();
        let json = serde_json::to_string(&did).unwrap();
        assert_eq!(json, "\"did:web:example.com\"");
        let parsed: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, did);
    }

    #[test]
    fn serde_rejects_invalid() {
        assert!(serde_json::from_str::<Did>("\"\"").is_err());
    }
}
