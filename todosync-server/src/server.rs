//! HTTP surface of the collection server: shared state, axum router, and
//! handlers for the REST collection protocol.
//!
//! Routes, for a collection path of `todos`:
//! - `GET /todos` lists every task
//! - `POST /todos` creates a task from a draft (`201 Created`)
//! - `GET /todos/{id}` fetches one task
//! - `PUT /todos/{id}` replaces one task, keeping the path id
//! - `DELETE /todos/{id}` deletes one task (`204 No Content`)
//!
//! Unknown ids answer `404`. Invalid bodies answer `400`, whether they fail
//! to parse or miss required fields. Error bodies are JSON objects of the
//! form `{"error": "..."}`.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use todosync_proto::{Task, TaskDraft, TaskId, ValidationError};

use crate::store::{CollectionError, CollectionStore};

/// Default collection path segment.
const DEFAULT_COLLECTION_PATH: &str = "todos";

/// Shared server state.
pub struct ServerState {
    /// The task collection.
    pub store: CollectionStore,
    collection_path: String,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates state with an empty collection served at `/todos`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_COLLECTION_PATH, CollectionStore::new())
    }

    /// Creates state serving `store` under `/{collection_path}`.
    #[must_use]
    pub fn with_config(collection_path: &str, store: CollectionStore) -> Self {
        Self {
            store,
            collection_path: collection_path.trim_matches('/').to_string(),
        }
    }

    /// Collection path segment, without slashes.
    #[must_use]
    pub fn collection_path(&self) -> &str {
        &self.collection_path
    }
}

/// Request failures, rendered as JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The requested task does not exist.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The request body is missing required fields.
    #[error("invalid task: {0}")]
    Invalid(#[from] ValidationError),

    /// The request body is not a JSON task.
    #[error("malformed body: {0}")]
    BadBody(String),

    /// The collection cannot take more tasks.
    #[error("collection is full ({0} tasks)")]
    Full(usize),
}

impl From<CollectionError> for ServerError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::NotFound(id) => Self::NotFound(id),
            CollectionError::Full(max) => Self::Full(max),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadBody(rejection.body_text())
    }
}

impl ServerError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Invalid(_) | Self::BadBody(_) => StatusCode::BAD_REQUEST,
            Self::Full(_) => StatusCode::INSUFFICIENT_STORAGE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Builds the router for `state`'s collection path.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    let collection = format!("/{}", state.collection_path());
    let item = format!("{collection}/{{id}}");
    axum::Router::new()
        .route(&collection, get(list_tasks).post(create_task))
        .route(&item, get(get_task).put(replace_task).delete(delete_task))
        .with_state(state)
}

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-configured [`ServerState`].
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "collection server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn list_tasks(State(state): State<Arc<ServerState>>) -> Json<Vec<Task>> {
    let tasks = state.store.list().await;
    tracing::debug!(count = tasks.len(), "list tasks");
    Json(tasks)
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ServerError> {
    let Json(draft) = body?;
    draft.validate()?;
    let task = state.store.create(draft).await?;
    tracing::info!(task_id = ?task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ServerError> {
    let id = TaskId::new(id);
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .ok_or(ServerError::NotFound(id))
}

async fn replace_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    body: Result<Json<Task>, JsonRejection>,
) -> Result<Json<Task>, ServerError> {
    let Json(task) = body?;
    task.validate()?;
    let id = TaskId::new(id);
    let stored = state.store.replace(&id, task).await?;
    tracing::info!(task_id = %id, completed = stored.completed, "task replaced");
    Ok(Json(stored))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = TaskId::new(id);
    state.store.remove(&id).await?;
    tracing::info!(task_id = %id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}
