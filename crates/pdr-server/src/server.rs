use std::sync::Arc;

use pdr_repo::RepositoryManager;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::registry::ProcedureRegistry;
use crate::router::{build_router, build_router_with_cors};

/// PDR HTTP server.
pub struct PdrServer {
    config: ServerConfig,
    state: AppState,
}

impl PdrServer {
    /// Open the configured store and build the server around it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let manager = Arc::new(config.build_manager()?);
        Ok(Self::with_manager(config, manager))
    }

    pub fn with_manager(config: ServerConfig, manager: Arc<RepositoryManager>) -> Self {
        let registry = Arc::new(ProcedureRegistry::with_defaults());
        Self {
            config,
            state: AppState::new(manager, registry),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<RepositoryManager> {
        &self.state.manager
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        if self.config.permissive_cors {
            build_router_with_cors(self.state.clone())
        } else {
            build_router(self.state.clone())
        }
    }

    /// Start serving requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let signer = self.manager().chain().signer().map(|k| k.verifying_key().to_hex());
        tracing::info!(
            addr = %self.config.bind_addr,
            storage = ?self.config.storage,
            hash = %self.config.hash_algorithm,
            procedures = ?self.state.registry.nsids(),
            signing_key = signer.as_deref().unwrap_or("none"),
            "PDR server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
