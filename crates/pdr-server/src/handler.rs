use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use pdr_repo::{Document, RepositoryManager};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};
use crate::registry::{blocking, ProcedureInput, ProcedureRegistry};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RepositoryManager>,
    pub registry: Arc<ProcedureRegistry>,
}

impl AppState {
    pub fn new(manager: Arc<RepositoryManager>, registry: Arc<ProcedureRegistry>) -> Self {
        Self { manager, registry }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub content: String,
}

/// `POST /posts/create`
pub async fn create_post_handler(
    State(state): State<AppState>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<Document>)> {
    let Json(req) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let doc = blocking(state.manager, move |m| m.create_post(&req.did, &req.content)).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub did: Option<String>,
}

/// `GET /posts/get?did=...`
pub async fn list_posts_handler(
    State(state): State<AppState>,
    query: Result<Query<ListPostsQuery>, QueryRejection>,
) -> ServerResult<Json<Vec<Document>>> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let did = query
        .did
        .ok_or_else(|| ServerError::BadRequest("missing query parameter: did".into()))?;
    let posts = blocking(state.manager, move |m| m.list_posts(&did)).await?;
    Ok(Json(posts))
}

/// `GET|POST /xrpc/{procedure}`
pub async fn xrpc_handler(
    State(state): State<AppState>,
    Path(nsid): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {e}")))?
    };
    let output = state
        .registry
        .dispatch(&nsid, state.manager, ProcedureInput { params, body })
        .await?;
    Ok(Json(output))
}
