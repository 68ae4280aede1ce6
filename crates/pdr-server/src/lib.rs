//! HTTP server for PDR.
//!
//! Exposes post creation and listing over plain JSON endpoints plus an XRPC
//! style `/xrpc/{procedure}` route backed by an explicit procedure registry.

pub mod config;
pub mod error;
pub mod handler;
pub mod registry;
pub mod router;
pub mod server;

pub use config::{ServerConfig, StorageConfig};
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use registry::{Procedure, ProcedureInput, ProcedureRegistry};
pub use server::PdrServer;
