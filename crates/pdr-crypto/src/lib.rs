//! Cryptographic primitives for PDR.
//!
//! Provides the versionable content hasher that turns commit payloads into
//! [`pdr_types::CommitId`]s, and Ed25519 signing/verification for optional
//! commit signatures.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, HashAlgorithm, HasherError};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
