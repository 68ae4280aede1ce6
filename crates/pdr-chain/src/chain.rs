use chrono::{DateTime, Utc};
use pdr_crypto::{ContentHasher, SigningKey};
use pdr_types::{Commit, CommitId, Did};

use crate::error::ChainResult;
use crate::payload::CommitPayload;

/// Builds content-addressed commits.
///
/// A commit's id is `hasher.hash(data)`, so two commits with the same payload
/// bytes have the same id regardless of DID, `prev`, or time. When a signing
/// key is configured every built commit carries an Ed25519 signature over its
/// id bytes.
#[derive(Clone, Debug, Default)]
pub struct CommitChain {
    hasher: ContentHasher,
    signer: Option<SigningKey>,
}

impl CommitChain {
    pub fn new(hasher: ContentHasher) -> Self {
        Self {
            hasher,
            signer: None,
        }
    }

    /// Sign every commit built from now on with `key`.
    pub fn with_signer(mut self, key: SigningKey) -> Self {
        self.signer = Some(key);
        self
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    pub fn signer(&self) -> Option<&SigningKey> {
        self.signer.as_ref()
    }

    /// Build a commit over raw payload bytes.
    pub fn build_commit(
        &self,
        did: &Did,
        prev: CommitId,
        data: Vec<u8>,
        created_at: DateTime<Utc>,
    ) -> Commit {
        let id = self.hasher.hash(&data);
        let signature = self.signer.as_ref().map(|key| key.sign_commit(&id).to_vec());
        Commit {
            id,
            repository_did: did.clone(),
            prev,
            data,
            signature,
            created_at,
        }
    }

    /// Encode `payload` canonically and build a commit over it.
    pub fn build_payload_commit(
        &self,
        did: &Did,
        prev: CommitId,
        payload: &CommitPayload,
        created_at: DateTime<Utc>,
    ) -> ChainResult<Commit> {
        Ok(self.build_commit(did, prev, payload.to_bytes()?, created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::at;
    use pdr_crypto::{HashAlgorithm, Signature};
    use proptest::prelude::*;
    use serde_json::json;

    fn did(s: &str) -> Did {
        Did::parse(s).unwrap()
    }

    #[test]
    fn id_is_hash_of_data() {
        let chain = CommitChain::default();
        let c = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, b"payload".to_vec(), at(1));
        assert_eq!(c.id, ContentHasher::BLAKE3.hash(b"payload"));
        assert!(c.is_genesis());
        assert!(c.signature.is_none());
        assert_eq!(c.created_at, at(1));
    }

    #[test]
    fn sha256_chain_matches_sha256_hash() {
        let chain = CommitChain::new(ContentHasher::new(HashAlgorithm::Sha256));
        let c = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, b"abc".to_vec(), at(1));
        assert_eq!(
            c.id.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn prev_is_carried() {
        let chain = CommitChain::default();
        let prev = CommitId::from_hash([9; 32]);
        let c = chain.build_commit(&did("did:plc:a"), prev, b"x".to_vec(), at(1));
        assert_eq!(c.prev, prev);
        assert!(!c.is_genesis());
    }

    #[test]
    fn signed_commits_verify() {
        let key = SigningKey::generate();
        let vk = key.verifying_key();
        let chain = CommitChain::default().with_signer(key);
        let c = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, b"x".to_vec(), at(1));

        let sig = Signature::from_slice(c.signature.as_deref().unwrap()).unwrap();
        assert!(vk.verify_commit(&c.id, &sig).is_ok());
        assert!(vk.verify_commit(&CommitId::from_hash([1; 32]), &sig).is_err());
    }

    #[test]
    fn payload_commit_hashes_canonical_bytes() {
        let chain = CommitChain::default();
        let payload = CommitPayload::create("post/1", json!({"text": "hello"}));
        let c = chain
            .build_payload_commit(&did("did:plc:a"), CommitId::EMPTY, &payload, at(1))
            .unwrap();
        assert_eq!(c.data, payload.to_bytes().unwrap());
        assert_eq!(c.id, chain.hasher().hash(&c.data));
        assert_eq!(c.payload_json().unwrap()["op"], "create");
    }

    proptest! {
        #[test]
        fn id_depends_only_on_data(
            data in prop::collection::vec(any::<u8>(), 0..256),
            prev in any::<[u8; 32]>(),
            secs in 0i64..1_000_000,
        ) {
            let chain = CommitChain::default();
            let a = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, data.clone(), at(0));
            let b = chain.build_commit(
                &did("did:plc:b"),
                CommitId::from_hash(prev),
                data,
                at(secs),
            );
            prop_assert_eq!(a.id, b.id);
        }

        #[test]
        fn different_data_gives_different_ids(
            a in prop::collection::vec(any::<u8>(), 0..64),
            b in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            prop_assume!(a != b);
            let chain = CommitChain::default();
            let ca = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, a, at(0));
            let cb = chain.build_commit(&did("did:plc:a"), CommitId::EMPTY, b, at(0));
            prop_assert_ne!(ca.id, cb.id);
        }
    }
}
