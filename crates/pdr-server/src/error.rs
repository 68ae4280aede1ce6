use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use pdr_repo::RepoError;
use pdr_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("procedure not found: {0}")]
    UnknownProcedure(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Repo(RepoError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Repo(RepoError::NotFound(_)) | Self::UnknownProcedure(_) => StatusCode::NOT_FOUND,
            Self::Repo(e) if e.is_conflict() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `error` field in the response body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Repo(e) => e.kind(),
            Self::BadRequest(_) => "InvalidRequest",
            Self::UnknownProcedure(_) => "MethodNotImplemented",
            Self::Store(_) => "StorageError",
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
