use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all PDR endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/posts/create", post(handler::create_post_handler))
        .route("/posts/get", get(handler::list_posts_handler))
        .route(
            "/xrpc/:procedure",
            get(handler::xrpc_handler).post(handler::xrpc_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// [`build_router`] with a permissive CORS policy on top.
pub fn build_router_with_cors(state: AppState) -> Router {
    build_router(state).layer(CorsLayer::permissive())
}
