//! Upstream search endpoint.
//!
//! The endpoint takes a `query` parameter and answers with
//! `{ "hits": [{ "objectID", "title", "url" }, ...] }`, the shape of the
//! Hacker News Algolia API.

use crate::config::SearchConfig;
use crate::state::{FetchError, Hit};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Something that can run a search
///
/// Returned futures are boxed so the client can live behind
/// `Arc<dyn SearchClient>` in an environment.
pub trait SearchClient: Send + Sync {
    /// Search for `query`, resolving to hits in upstream order
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Hit>, FetchError>>;
}

/// Failures of the HTTP transport
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be built or sent
    #[error("search request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("search endpoint returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The body was not the expected JSON
    #[error("could not decode search response: {0}")]
    Decode(String),
}

impl From<ClientError> for FetchError {
    fn from(error: ClientError) -> Self {
        Self::failed(error.to_string())
    }
}

/// Response body as sent by the endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<WireHit>,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl SearchResponse {
    /// Convert to domain hits, keeping the first of any repeated id
    fn into_hits(self) -> Vec<Hit> {
        let mut seen = HashSet::new();
        self.hits
            .into_iter()
            .filter(|hit| {
                let fresh = seen.insert(hit.object_id.clone());
                if !fresh {
                    tracing::debug!(id = %hit.object_id, "Dropping repeated hit id");
                }
                fresh
            })
            .map(|hit| Hit {
                id: hit.object_id,
                title: hit.title.unwrap_or_default(),
                url: hit.url.unwrap_or_default(),
            })
            .collect()
    }
}

/// Decode a response body into hits
///
/// # Errors
///
/// Returns [`ClientError::Decode`] if `body` is not a JSON object with a
/// `hits` array of objects carrying an `objectID`.
pub fn decode_hits(body: &[u8]) -> Result<Vec<Hit>, ClientError> {
    serde_json::from_slice::<SearchResponse>(body)
        .map(SearchResponse::into_hits)
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// [`SearchClient`] over HTTP
#[derive(Clone, Debug)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchClient {
    /// Build a client for the configured endpoint and timeout
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &SearchConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("searchbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint queries are sent to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run one search
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure, non-2xx status, or an
    /// undecodable body.
    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn fetch(&self, query: &str) -> Result<Vec<Hit>, ClientError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let hits = decode_hits(&body)?;

        tracing::debug!(hit_count = hits.len(), "Search completed");
        Ok(hits)
    }
}

impl SearchClient for HttpSearchClient {
    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Hit>, FetchError>> {
        async move { self.fetch(query).await.map_err(FetchError::from) }.boxed()
    }
}
