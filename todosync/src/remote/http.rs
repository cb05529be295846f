//! REST implementation of [`CollectionClient`] over `reqwest`.
//!
//! The client is rooted at the collection URL (e.g.
//! `http://127.0.0.1:9000/todos`); item URLs are built by appending the
//! task identifier as one path segment.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use todosync_proto::{Task, TaskDraft, TaskId};
use url::Url;

use super::{CollectionClient, RemoteError};

/// HTTP client for one task collection resource.
#[derive(Debug, Clone)]
pub struct HttpCollectionClient {
    client: Client,
    collection_url: Url,
}

impl HttpCollectionClient {
    /// Create a client for the collection at `collection_url`.
    ///
    /// `timeout` bounds each whole request.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if the URL cannot be parsed or
    /// cannot carry path segments, or [`RemoteError::Transport`] if the
    /// underlying HTTP client cannot be built.
    pub fn new(collection_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let parsed = Url::parse(collection_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{collection_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(format!(
                "{collection_url}: not a hierarchical URL"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RemoteError::Transport {
                url: collection_url.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            collection_url: parsed,
        })
    }

    /// The collection URL this client talks to.
    #[must_use]
    pub const fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// Build `{collection}/{id}`.
    fn item_url(&self, id: &TaskId) -> Result<Url, RemoteError> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidUrl(self.collection_url.to_string()))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    /// Send a request and map transport failures.
    async fn send(
        request: RequestBuilder,
        method: &'static str,
        url: &Url,
    ) -> Result<Response, RemoteError> {
        tracing::debug!(method, url = %url, "collection request");
        request
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })
    }

    /// Reject non-success responses.
    fn check_status(
        response: Response,
        method: &'static str,
        url: &Url,
    ) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    /// Read the body and decode it as JSON.
    async fn decode<T: DeserializeOwned>(response: Response, url: &Url) -> Result<T, RemoteError> {
        let body = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })?;
        serde_json::from_str(&body).map_err(|e| RemoteError::InvalidBody {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CollectionClient for HttpCollectionClient {
    async fn list(&self) -> Result<Vec<Task>, RemoteError> {
        let url = &self.collection_url;
        let response = Self::send(self.client.get(url.clone()), "GET", url).await?;
        let response = Self::check_status(response, "GET", url)?;
        Self::decode(response, url).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, RemoteError> {
        let url = self.item_url(id)?;
        let response = Self::send(self.client.get(url.clone()), "GET", &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(response, "GET", &url)?;
        Self::decode(response, &url).await.map(Some)
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, RemoteError> {
        let url = &self.collection_url;
        let request = self.client.post(url.clone()).json(draft);
        let response = Self::send(request, "POST", url).await?;
        let response = Self::check_status(response, "POST", url)?;
        Self::decode(response, url).await
    }

    async fn update(&self, id: &TaskId, task: &Task) -> Result<Task, RemoteError> {
        let url = self.item_url(id)?;
        let request = self.client.put(url.clone()).json(task);
        let response = Self::send(request, "PUT", &url).await?;
        let response = Self::check_status(response, "PUT", &url)?;
        Self::decode(response, &url).await
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError> {
        let url = self.item_url(id)?;
        let response = Self::send(self.client.delete(url.clone()), "DELETE", &url).await?;
        Self::check_status(response, "DELETE", &url)?;
        Ok(())
    }
}
