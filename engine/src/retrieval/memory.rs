//! In-Memory Document Source
//!
//! A fixed document list behind the DocumentSource trait, ranked by naive
//! term overlap with the query. Backs the integration tests and offline
//! smoke runs where no search service is available.

use async_trait::async_trait;

use super::{Document, DocumentFilter, DocumentSource, Result, SearchQuery};

/// Document source over a fixed in-memory list
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    docs: Vec<Document>,
}

impl StaticSource {
    /// Create a source over the given documents
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }

    /// Create a source that never returns documents
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(
        &self,
        query: &SearchQuery,
        filter: &DocumentFilter,
        k: usize,
    ) -> Result<Vec<Document>> {
        let terms: Vec<String> = query
            .as_str()
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        let mut hits: Vec<(usize, &Document)> = self
            .docs
            .iter()
            .filter(|doc| match filter {
                DocumentFilter::Ids(ids) => ids.contains(&doc.id),
                DocumentFilter::Client(_) => true,
            })
            .map(|doc| {
                let body = doc.body.to_lowercase();
                let score = terms.iter().filter(|term| body.contains(*term)).count();
                (score, doc)
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(hits.into_iter().take(k).map(|(_, doc)| doc.clone()).collect())
    }
}
