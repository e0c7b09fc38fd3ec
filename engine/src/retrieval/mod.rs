//! Document Retrieval Layer
//!
//! This module provides a common interface for fetching candidate documents
//! for a section's research round. The DocumentSource trait abstracts over
//! the configured backend (HTTP vector search in production, an in-memory
//! source in tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QuillErrorExt;

pub mod http;
pub mod memory;

pub use http::HttpVectorSource;
pub use memory::StaticSource;

/// Result type for retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur during document retrieval
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Search service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl QuillErrorExt for RetrievalError {
    fn user_hint(&self) -> &str {
        match self {
            Self::ServiceUnavailable(_) => "Search service unreachable. Check retrieval.endpoint",
            Self::AuthenticationFailed(_) => "Search authentication failed. Check QUILL_SEARCH_API_KEY",
            Self::Api { .. } => "Search service rejected the request",
            Self::NetworkError(_) => "Network error talking to the search service",
            Self::Timeout => "Search service took too long to respond. Try again",
            Self::ParseError(_) => "Could not parse the search response",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::AuthenticationFailed(_))
    }
}

/// A single normalized search query
///
/// Models return queries as bare strings, as `{"search_query": "..."}`
/// objects, or a mix of both in one list. Deserialization collapses all of
/// these into this one type, trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Create a normalized query
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into().trim().to_string())
    }

    /// The query text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when normalization left nothing to search for
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for SearchQuery {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Object { search_query: String },
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Ok(SearchQuery::new(text)),
            Raw::Object { search_query } => Ok(SearchQuery::new(search_query)),
        }
    }
}

/// A retrieved document
///
/// Identity is `id`; deduplication during a research round compares ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier for deduplication
    pub id: String,

    /// Human-readable title, when the backend provides one
    pub title: Option<String>,

    /// Full document text
    pub body: String,
}

impl Document {
    /// Create a document with a backend-assigned identifier
    pub fn new(
        id: impl Into<String>,
        title: Option<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title,
            body: body.into(),
        }
    }

    /// Create a document whose identifier is derived from its body
    ///
    /// Backends that return hits without an id get a content-addressed one,
    /// so the same text always dedupes to the same document.
    pub fn with_derived_id(title: Option<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let id = blake3::hash(body.as_bytes()).to_hex().to_string();
        Self { id, title, body }
    }
}

/// Scope restricting which documents a search may return
///
/// Exactly one of the two filters applies to a run: an explicit allow-list
/// of document identifiers, or everything belonging to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentFilter {
    /// Only documents with these identifiers
    #[serde(rename = "document_ids")]
    Ids(Vec<String>),

    /// All documents belonging to this client
    #[serde(rename = "client_id")]
    Client(String),
}

/// Document source trait that all retrieval backends implement
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Returns the name of the source (e.g., "vector-search", "static")
    fn name(&self) -> &str;

    /// Fetch up to `k` candidate documents for the query within the filter scope
    async fn search(
        &self,
        query: &SearchQuery,
        filter: &DocumentFilter,
        k: usize,
    ) -> Result<Vec<Document>>;

    /// Check if the source is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}
