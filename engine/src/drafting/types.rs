//! Drafting data model
//!
//! Section specs come out of planning once and never change; section
//! records are the mutable unit of work the control loop drives through
//! research, writing, and grading.

use serde::{Deserialize, Serialize};

use crate::retrieval::{Document, SearchQuery};

/// One planned proposal section
///
/// Immutable after plan creation. The description is the structured brief
/// (required content, alignment rationale, guiding questions, evidence
/// requirements) that both research and grading are measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Proposal-section title
    pub name: String,

    /// The brief this section is researched and graded against
    pub description: String,

    /// Whether the research loop gathers supporting documents for it
    pub requires_research: bool,
}

impl SectionSpec {
    /// Create a new section spec
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        requires_research: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            requires_research,
        }
    }
}

/// Work state for one section
///
/// Created 1:1 with its spec at plan time and mutated in place until the
/// run terminates. "Done" is a state (`is_written`), never a deletion.
#[derive(Debug, Clone)]
pub struct SectionRecord {
    /// The immutable brief this record works toward
    pub spec: SectionSpec,

    /// Drafted text; empty until written, overwritten on each redraft
    pub content: String,

    /// True once the grade passed or the retry budget ran out
    pub is_written: bool,

    /// True while this record is the one undergoing research/writing.
    /// At most one record registry-wide is active at a time.
    pub is_active: bool,

    /// Queries for the current research round, replaced wholesale each round
    pub search_queries: Vec<SearchQuery>,

    /// Documents accepted by the most recent successful research round.
    /// An exhausted round commits nothing, so earlier materials survive it.
    pub retrieved_documents: Vec<Document>,

    /// Concatenated bodies of `retrieved_documents`, paired 1:1 with it
    pub source_text: String,

    /// Failed-grade retries consumed, bounded by the configured ceiling
    pub search_iterations: u32,
}

impl SectionRecord {
    /// Create a fresh record for a spec
    pub fn new(spec: SectionSpec) -> Self {
        Self {
            spec,
            content: String::new(),
            is_written: false,
            is_active: false,
            search_queries: Vec::new(),
            retrieved_documents: Vec::new(),
            source_text: String::new(),
            search_iterations: 0,
        }
    }
}

/// Proposal-wide context every drafting call sees
///
/// Gathered from the conversation (project idea, funding requirements) and
/// configuration (client identity, structure template) before the run starts.
#[derive(Debug, Clone)]
pub struct ProposalContext {
    /// What the applicant wants to do
    pub project_idea: String,

    /// The funder's requirements and constraints
    pub funding_requirements: String,

    /// Template describing the expected shape of the whole proposal
    pub proposal_structure: String,

    /// Name of the person the assistant is drafting for
    pub user_name: String,

    /// Organization the proposal is written on behalf of
    pub client_name: String,

    /// Background blurb about the client organization
    pub about_client: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_starts_clean() {
        let record = SectionRecord::new(SectionSpec::new("Budget", "Cost breakdown", true));

        assert_eq!(record.spec.name, "Budget");
        assert!(record.content.is_empty());
        assert!(!record.is_written);
        assert!(!record.is_active);
        assert!(record.search_queries.is_empty());
        assert_eq!(record.search_iterations, 0);
    }

    #[test]
    fn test_spec_round_trips_through_serde() {
        let spec = SectionSpec::new("Need", "Why it matters", true);
        let json = serde_json::to_string(&spec).unwrap();
        let back: SectionSpec = serde_json::from_str(&json).unwrap();

        assert_eq!(back, spec);
    }
}
