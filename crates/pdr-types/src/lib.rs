//! Foundation types for PDR, a per-identity personal data repository.
//!
//! Every other PDR crate depends on `pdr-types`.
//!
//! # Key Types
//!
//! - [`Did`] -- Opaque identifier of a repository owner
//! - [`CommitId`] -- Content-addressed commit identifier (256-bit hash, hex)
//! - [`Repository`] -- Per-identity head pointer and timestamps
//! - [`Commit`] -- Immutable, hash-identified mutation record
//! - [`Document`] -- Typed record materialized by a commit
//! - [`MonotonicClock`] -- Strictly increasing wall-clock timestamps

pub mod commit_id;
pub mod did;
pub mod error;
pub mod record;
pub mod temporal;

pub use commit_id::CommitId;
pub use did::Did;
pub use error::TypeError;
pub use record::{Commit, Document, Repository, POST_KIND, POST_PATH_PREFIX};
pub use temporal::{format_timestamp, parse_timestamp, MonotonicClock};
