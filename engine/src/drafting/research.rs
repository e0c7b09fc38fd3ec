//! Research Retriever
//!
//! Fills the active section with graded supporting documents. Each round
//! runs a bounded number of attempts; within an attempt every query is
//! searched and every hit is graded for relevance before it may enter the
//! accumulator. The section record is only updated when an attempt ends
//! with at least one accepted document, so an exhausted round leaves any
//! earlier materials in place.

use crate::drafting::prompts;
use crate::drafting::types::{ProposalContext, SectionRecord};
use crate::llm::{first_json_array, first_json_object, Message, ModelRole, ModelRouter};
use crate::retrieval::{DocumentFilter, DocumentSource, SearchQuery};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Attempt budget and fan-out knobs for one retriever
#[derive(Debug, Clone)]
pub struct ResearchSettings {
    /// Queries generated per section
    pub number_of_queries: usize,

    /// Documents requested per query
    pub max_vector_results: usize,

    /// Full search-and-grade passes before giving up on a round
    pub max_attempts: u32,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            number_of_queries: 10,
            max_vector_results: 5,
            max_attempts: 2,
        }
    }
}

/// How a research round ended
///
/// Both outcomes let the writer proceed; `Exhausted` is reported, not
/// raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchOutcome {
    /// At least one relevant document was committed to the record
    Success { attempts: u32, documents: usize },

    /// Every attempt ended empty; the record was left untouched
    Exhausted { attempts: u32 },
}

pub struct ResearchRetriever {
    router: Arc<ModelRouter>,
    source: Arc<dyn DocumentSource>,
    filter: DocumentFilter,
    ctx: ProposalContext,
    settings: ResearchSettings,
}

/// Intermediate deserialization type for the relevance grade
#[derive(Debug, Deserialize)]
struct RawBinaryGrade {
    binary_score: String,
}

impl ResearchRetriever {
    pub fn new(
        router: Arc<ModelRouter>,
        source: Arc<dyn DocumentSource>,
        filter: DocumentFilter,
        ctx: ProposalContext,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            router,
            source,
            filter,
            ctx,
            settings,
        }
    }

    /// Generate the search queries for a section brief
    pub async fn generate_queries(&self, section_description: &str) -> Result<Vec<SearchQuery>> {
        let system_prompt = Message::system(prompts::write_queries(
            section_description,
            self.settings.number_of_queries,
            &self.ctx,
        ));
        let user_prompt = Message::user("Generate search queries on the provided topic.");

        let response = self
            .router
            .generate(ModelRole::Writer, &[system_prompt, user_prompt])
            .await?;

        let json_str = first_json_array(&response.content).unwrap_or_else(|| response.content.trim());
        let queries: Vec<SearchQuery> =
            serde_json::from_str(json_str).context("Failed to parse search queries JSON")?;

        Ok(queries.into_iter().filter(|q| !q.is_empty()).collect())
    }

    /// Run one bounded research round for the active section
    ///
    /// Retrieval and model transport errors propagate; running out of
    /// attempts does not.
    pub async fn research_section(&self, record: &mut SectionRecord) -> Result<ResearchOutcome> {
        let queries: Vec<SearchQuery> = record.search_queries.clone();

        for attempt in 1..=self.settings.max_attempts {
            let mut documents = Vec::new();
            let mut source_text = String::new();
            let mut accepted_ids: HashSet<String> = HashSet::new();

            for query in &queries {
                let hits = self
                    .source
                    .search(query, &self.filter, self.settings.max_vector_results)
                    .await?;

                tracing::debug!(
                    "Query '{}' returned {} documents on attempt {}",
                    query,
                    hits.len(),
                    attempt
                );

                for hit in hits {
                    let prompt = prompts::grade_document(query.as_str(), &hit.body);
                    let grade = self
                        .router
                        .generate(ModelRole::Grader, &[Message::user(prompt)])
                        .await?;

                    if parse_binary_grade(&grade.content) && accepted_ids.insert(hit.id.clone()) {
                        source_text.push_str(&hit.body);
                        documents.push(hit);
                    }
                }
            }

            if !documents.is_empty() {
                let count = documents.len();
                record.retrieved_documents = documents;
                record.source_text = source_text;

                tracing::debug!(
                    "Section '{}' accepted {} documents on attempt {}",
                    record.spec.name,
                    count,
                    attempt
                );

                return Ok(ResearchOutcome::Success {
                    attempts: attempt,
                    documents: count,
                });
            }
        }

        tracing::warn!(
            "No relevant documents found for section '{}' after {} attempts",
            record.spec.name,
            self.settings.max_attempts
        );

        Ok(ResearchOutcome::Exhausted {
            attempts: self.settings.max_attempts,
        })
    }
}

/// Parse a relevance grade, treating anything unreadable as "no"
fn parse_binary_grade(content: &str) -> bool {
    if let Some(json_str) = first_json_object(content) {
        if let Ok(grade) = serde_json::from_str::<RawBinaryGrade>(json_str) {
            return grade.binary_score.eq_ignore_ascii_case("yes");
        }
    }

    let bare = content.trim().trim_matches(|c| c == '"' || c == '\'');
    if bare.eq_ignore_ascii_case("yes") {
        return true;
    }
    if bare.eq_ignore_ascii_case("no") {
        return false;
    }

    tracing::warn!("Unreadable relevance grade, treating as not relevant");
    false
}
