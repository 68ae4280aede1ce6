//! Optional Ed25519 commit signatures.
//!
//! The signed message is always the raw 32-byte commit id. The id already
//! commits to the payload, so a signature over it covers the whole commit.
//! Keys travel as hex: secret keys in server config, public keys on the
//! `pdr verify --key` command line.

use pdr_types::CommitId;

/// Secret key a repository operator signs commits with.
#[derive(Clone)]
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Public half of a [`SigningKey`], used to check stored commit signatures.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey(ed25519_dalek::VerifyingKey);

/// A commit signature, stored next to the commit as 64 raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl SigningKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    pub fn from_bytes(secret: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&secret))
    }

    /// Parse a 64-character hex secret.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        Ok(Self::from_bytes(decode_key(s)?))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    pub fn sign_commit(&self, id: &CommitId) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(id.as_bytes()))
    }
}

impl VerifyingKey {
    /// Parse a 64-character hex public key.
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&decode_key(s)?)
            .map(Self)
            .map_err(|_| SignatureError::InvalidKey)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    /// Check a signature produced by [`SigningKey::sign_commit`].
    pub fn verify_commit(
        &self,
        id: &CommitId,
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(id.as_bytes(), &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }
}

impl Signature {
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    /// Decode the stored form; anything but 64 bytes is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureError::MalformedSignature(bytes.len()))?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&arr)))
    }
}

fn decode_key(s: &str) -> Result<[u8; 32], SignatureError> {
    hex::decode(s.trim())
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(SignatureError::InvalidKey)
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0.to_bytes()[..4]))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match commit")]
    InvalidSignature,
    #[error("invalid key: expected 64 hex characters")]
    InvalidKey,
    #[error("malformed signature: expected 64 bytes, got {0}")]
    MalformedSignature(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_signature_covers_id() {
        let sk = SigningKey::generate();
        let vk = sk.verifying_key();
        let id = CommitId::from_hash([9; 32]);
        let sig = sk.sign_commit(&id);
        assert!(vk.verify_commit(&id, &sig).is_ok());
        assert_eq!(
            vk.verify_commit(&CommitId::from_hash([8; 32]), &sig),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn other_key_rejects_signature() {
        let id = CommitId::from_hash([1; 32]);
        let sig = SigningKey::generate().sign_commit(&id);
        let stranger = SigningKey::generate().verifying_key();
        assert!(stranger.verify_commit(&id, &sig).is_err());
    }

    #[test]
    fn stored_signature_roundtrip() {
        let sig = SigningKey::generate().sign_commit(&CommitId::from_hash([3; 32]));
        let stored = sig.to_vec();
        assert_eq!(stored.len(), 64);
        assert_eq!(Signature::from_slice(&stored).unwrap(), sig);
        assert_eq!(
            Signature::from_slice(&stored[..10]),
            Err(SignatureError::MalformedSignature(10))
        );
    }

    #[test]
    fn keys_parse_from_hex() {
        let secret = [7u8; 32];
        let sk = SigningKey::from_hex(&hex::encode(secret)).unwrap();
        assert_eq!(sk.verifying_key(), SigningKey::from_bytes(secret).verifying_key());

        let public = sk.verifying_key().to_hex();
        assert_eq!(public.len(), 64);
        assert_eq!(VerifyingKey::from_hex(&public).unwrap(), sk.verifying_key());

        assert_eq!(SigningKey::from_hex("abcd").unwrap_err(), SignatureError::InvalidKey);
        assert_eq!(VerifyingKey::from_hex("zz").unwrap_err(), SignatureError::InvalidKey);
    }

    #[test]
    fn debug_redacts_signing_key() {
        let debug = format!("{:?}", SigningKey::generate());
        assert!(debug.contains("redacted"));
    }
}
