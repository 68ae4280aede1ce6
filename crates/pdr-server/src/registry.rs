//! XRPC procedure dispatch.
//!
//! Procedures are registered on an explicit [`ProcedureRegistry`] built once
//! at startup and shared through the router state; nothing is registered
//! globally.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use pdr_repo::RepositoryManager;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ServerError, ServerResult};

/// Default number of commits returned by `getHistory`.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Everything a procedure receives from the request.
#[derive(Clone, Debug, Default)]
pub struct ProcedureInput {
    /// Query string parameters.
    pub params: HashMap<String, String>,
    /// Parsed JSON body, `Value::Null` when the request had none.
    pub body: Value,
}

impl ProcedureInput {
    /// A required parameter, looked up in the query string then the body.
    pub fn required(&self, name: &str) -> ServerResult<String> {
        self.params
            .get(name)
            .cloned()
            .or_else(|| self.body.get(name).and_then(Value::as_str).map(str::to_owned))
            .ok_or_else(|| ServerError::BadRequest(format!("missing parameter: {name}")))
    }

    pub fn optional_usize(&self, name: &str) -> ServerResult<Option<usize>> {
        let raw = match (self.params.get(name), self.body.get(name)) {
            (Some(s), _) => s.clone(),
            (None, Some(v)) if !v.is_null() => {
                v.as_str().map_or_else(|| v.to_string(), str::to_owned)
            }
            _ => return Ok(None),
        };
        raw.parse()
            .map(Some)
            .map_err(|_| ServerError::BadRequest(format!("{name} must be a non-negative integer")))
    }
}

/// A named remote procedure.
#[async_trait]
pub trait Procedure: Send + Sync {
    /// Namespaced identifier, e.g. `com.pdr.repo.createPost`.
    fn nsid(&self) -> &'static str;

    async fn call(
        &self,
        manager: Arc<RepositoryManager>,
        input: ProcedureInput,
    ) -> ServerResult<Value>;
}

/// Run a manager call on the blocking pool.
pub async fn blocking<T, F>(manager: Arc<RepositoryManager>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RepositoryManager) -> pdr_repo::RepoResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || f(&manager))
        .await
        .map_err(|e| ServerError::Internal(format!("worker task failed: {e}")))?;
    Ok(result?)
}

fn to_json(value: impl serde::Serialize) -> ServerResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServerError::Internal(format!("encoding response: {e}")))
}

/// Lookup table from NSID to procedure.
#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: BTreeMap<&'static str, Arc<dyn Procedure>>,
}

impl ProcedureRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in repository procedures.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CreatePost);
        registry.register(ListPosts);
        registry.register(GetHistory);
        registry
    }

    /// Add a procedure, replacing any previous one with the same NSID.
    pub fn register(&mut self, procedure: impl Procedure + 'static) {
        let nsid = procedure.nsid();
        if self.procedures.insert(nsid, Arc::new(procedure)).is_some() {
            tracing::warn!(nsid, "procedure replaced");
        }
    }

    pub fn get(&self, nsid: &str) -> Option<Arc<dyn Procedure>> {
        self.procedures.get(nsid).cloned()
    }

    /// Registered NSIDs, sorted.
    pub fn nsids(&self) -> Vec<&'static str> {
        self.procedures.keys().copied().collect()
    }

    pub async fn dispatch(
        &self,
        nsid: &str,
        manager: Arc<RepositoryManager>,
        input: ProcedureInput,
    ) -> ServerResult<Value> {
        let procedure = self
            .get(nsid)
            .ok_or_else(|| ServerError::UnknownProcedure(nsid.to_string()))?;
        tracing::debug!(nsid, "dispatching procedure");
        procedure.call(manager, input).await
    }
}

impl std::fmt::Debug for ProcedureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureRegistry")
            .field("procedures", &self.nsids())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in procedures
// ---------------------------------------------------------------------------

/// `com.pdr.repo.createPost`: body `{did, content}`, returns the document.
pub struct CreatePost;

#[derive(Deserialize)]
struct CreatePostInput {
    #[serde(default)]
    did: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Procedure for CreatePost {
    fn nsid(&self) -> &'static str {
        "com.pdr.repo.createPost"
    }

    async fn call(
        &self,
        manager: Arc<RepositoryManager>,
        input: ProcedureInput,
    ) -> ServerResult<Value> {
        let CreatePostInput { did, content } = if input.body.is_null() {
            CreatePostInput {
                did: input.params.get("did").cloned().unwrap_or_default(),
                content: input.params.get("content").cloned().unwrap_or_default(),
            }
        } else {
            serde_json::from_value(input.body)
                .map_err(|e| ServerError::BadRequest(e.to_string()))?
        };
        let doc = blocking(manager, move |m| m.create_post(&did, &content)).await?;
        to_json(doc)
    }
}

/// `com.pdr.repo.listPosts`: parameter `did`, returns `{posts: [...]}`.
pub struct ListPosts;

#[async_trait]
impl Procedure for ListPosts {
    fn nsid(&self) -> &'static str {
        "com.pdr.repo.listPosts"
    }

    async fn call(
        &self,
        manager: Arc<RepositoryManager>,
        input: ProcedureInput,
    ) -> ServerResult<Value> {
        let did = input.required("did")?;
        let posts = blocking(manager, move |m| m.list_posts(&did)).await?;
        let mut out = serde_json::Map::new();
        out.insert("posts".into(), to_json(posts)?);
        Ok(Value::Object(out))
    }
}

/// `com.pdr.repo.getHistory`: parameters `did` and optional `limit`,
/// returns `{head, commits: [...]}`, newest first. `commits` is walked from
/// the same repository snapshot that `head` comes from.
pub struct GetHistory;

#[async_trait]
impl Procedure for GetHistory {
    fn nsid(&self) -> &'static str {
        "com.pdr.repo.getHistory"
    }

    async fn call(
        &self,
        manager: Arc<RepositoryManager>,
        input: ProcedureInput,
    ) -> ServerResult<Value> {
        let did = input.required("did")?;
        let limit = input.optional_usize("limit")?.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let (repo, commits) = blocking(manager, move |m| {
            let repo = m.repository(&did)?;
            let commits = m.history_of(&repo, limit)?;
            Ok((repo, commits))
        })
        .await?;
        let mut out = serde_json::Map::new();
        out.insert("head".into(), to_json(repo.head)?);
        out.insert("commits".into(), to_json(commits)?);
        Ok(Value::Object(out))
    }
}
