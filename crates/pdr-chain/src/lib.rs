//! Commit chain for PDR.
//!
//! Every mutation of a repository is recorded as a [`pdr_types::Commit`]
//! whose id is the hash of its payload and whose `prev` points at the
//! previous head. This crate provides:
//! - [`CommitChain`]: builds (and optionally signs) commits
//! - [`CommitPayload`]: the canonical mutation encoding
//! - [`walk_history`]: lazy head-to-genesis traversal
//! - [`CommitChain::verify`]: integrity report over a whole chain
//! - [`replay`]: rebuild the document projection from history

pub mod chain;
pub mod error;
pub mod history;
pub mod payload;
pub mod replay;
pub mod verify;

pub use chain::CommitChain;
pub use error::{ChainError, ChainResult};
pub use history::{walk_history, History};
pub use payload::{CommitPayload, Op};
pub use replay::{replay, ReplayResult};
pub use verify::{ChainReport, Violation, ViolationKind};
