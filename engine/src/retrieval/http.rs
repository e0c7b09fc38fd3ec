//! HTTP Vector Search Source
//!
//! This module implements the DocumentSource trait against an HTTP vector
//! search service. Each query is POSTed to `{base_url}/search` with the
//! collection name, the result cap, and exactly one scope filter; hits come
//! back as id/title/body/score records.
//!
//! Authentication is a bearer token from the `QUILL_SEARCH_API_KEY`
//! environment variable, sent only when set.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Document, DocumentFilter, DocumentSource, Result, RetrievalError, SearchQuery};

/// Vector search client configuration
#[derive(Debug, Clone)]
pub struct HttpVectorSource {
    /// Base URL for the search service
    base_url: String,

    /// Collection to search within
    collection: String,

    /// HTTP client for API requests
    client: Client,
}

impl HttpVectorSource {
    /// Create a new vector search source
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the search service (e.g., "http://localhost:6333")
    /// * `collection` - Collection name to search within
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            collection: collection.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn api_key(&self) -> Option<String> {
        std::env::var("QUILL_SEARCH_API_KEY").ok()
    }
}

#[async_trait]
impl DocumentSource for HttpVectorSource {
    fn name(&self) -> &str {
        "vector-search"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        filter: &DocumentFilter,
        k: usize,
    ) -> Result<Vec<Document>> {
        let request = SearchRequest {
            query: query.as_str(),
            collection: &self.collection,
            k,
            filter,
        };

        tracing::debug!(
            "Vector search: collection={}, k={}, query_chars={}",
            self.collection,
            k,
            query.as_str().len()
        );

        let url = format!("{}/search", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(api_key) = self.api_key() {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RetrievalError::Timeout
            } else if e.is_connect() {
                RetrievalError::ServiceUnavailable(format!(
                    "Cannot connect to search service at {}",
                    self.base_url
                ))
            } else {
                RetrievalError::NetworkError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();

            if status == 401 || status == 403 {
                return Err(RetrievalError::AuthenticationFailed(message));
            }
            return Err(RetrievalError::Api { status, message });
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::ParseError(format!("Failed to parse search response: {}", e)))?;

        let documents = search_response
            .documents
            .into_iter()
            .map(|hit| {
                tracing::trace!("hit id={:?} score={:?}", hit.id, hit.score);
                match hit.id {
                    Some(id) => Document::new(id, hit.title, hit.body),
                    None => Document::with_derived_id(hit.title, hit.body),
                }
            })
            .collect();

        Ok(documents)
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Search API request format
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    collection: &'a str,
    k: usize,
    filter: &'a DocumentFilter,
}

/// Search API response format
#[derive(Debug, Deserialize)]
struct SearchResponse {
    documents: Vec<SearchHit>,
}

/// One hit in a search response
#[derive(Debug, Deserialize)]
struct SearchHit {
    id: Option<String>,
    title: Option<String>,
    body: String,
    score: Option<f64>,
}
