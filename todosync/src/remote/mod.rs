//! Remote collection abstraction for `todosync`.
//!
//! Defines the [`CollectionClient`] trait that every backend of the task
//! collection must satisfy. Concrete implementations:
//! - [`http::HttpCollectionClient`] — REST client over `reqwest`
//! - [`memory::InMemoryCollection`] — in-process collection for tests and demos

pub mod http;
pub mod memory;

use todosync_proto::{Task, TaskDraft, TaskId};

/// Errors that can occur while talking to the remote collection.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The request could not be completed (connect, timeout, I/O).
    #[error("request to {url} failed: {source}")]
    Transport {
        /// URL that was requested.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The collection answered with a non-success status.
    #[error("{method} {url} returned status {status}")]
    Status {
        /// HTTP method of the failed request.
        method: &'static str,
        /// URL that was requested.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("invalid response body from {url}: {reason}")]
    InvalidBody {
        /// URL that was requested.
        url: String,
        /// Decoder error message.
        reason: String,
    },

    /// The collection created a task without assigning an identifier.
    #[error("collection returned a created task without an id")]
    MissingId,

    /// The configured collection URL is unusable.
    #[error("invalid collection url: {0}")]
    InvalidUrl(String),

    /// The collection is not reachable at all.
    #[error("collection unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Returns `true` if the collection answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Async client for a single REST collection of tasks.
///
/// Every method corresponds to one request against the collection:
///
/// | method   | request                   |
/// |----------|---------------------------|
/// | `list`   | `GET /collection`         |
/// | `get`    | `GET /collection/{id}`    |
/// | `create` | `POST /collection`        |
/// | `update` | `PUT /collection/{id}`    |
/// | `delete` | `DELETE /collection/{id}` |
///
/// Timeouts are the implementation's concern; callers never cancel.
pub trait CollectionClient: Send + Sync {
    /// Fetch the full collection.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<Task>, RemoteError>> + Send;

    /// Fetch a single task. Returns `Ok(None)` when the collection has no
    /// task with this identifier.
    fn get(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<Option<Task>, RemoteError>> + Send;

    /// Create a task. The returned task carries the assigned identifier.
    fn create(
        &self,
        draft: &TaskDraft,
    ) -> impl std::future::Future<Output = Result<Task, RemoteError>> + Send;

    /// Replace a task with `task` and return the stored result.
    fn update(
        &self,
        id: &TaskId,
        task: &Task,
    ) -> impl std::future::Future<Output = Result<Task, RemoteError>> + Send;

    /// Delete a task.
    fn delete(&self, id: &TaskId)
    -> impl std::future::Future<Output = Result<(), RemoteError>> + Send;
}
