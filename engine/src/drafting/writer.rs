//! Section Writer
//!
//! Drafts a section from its accumulated source text, then grades the
//! draft against the section brief. Drafting always overwrites the
//! record's content; every other piece of section state belongs to the
//! control loop and is never touched here.

use crate::drafting::prompts;
use crate::drafting::types::{ProposalContext, SectionRecord, SectionSpec};
use crate::llm::{first_json_object, Message, ModelRole, ModelRouter};
use crate::retrieval::SearchQuery;
use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;

/// Verdict on a drafted section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Pass,
    Fail,
}

/// Outcome of grading one draft
#[derive(Debug, Clone)]
pub struct SectionReview {
    pub grade: Grade,

    /// Queries to research next when the draft failed
    pub follow_up_queries: Vec<SearchQuery>,
}

pub struct SectionWriter {
    router: Arc<ModelRouter>,
    ctx: ProposalContext,
}

/// Intermediate deserialization type for the grader's JSON output
#[derive(Debug, Deserialize)]
struct RawSectionReview {
    grade: String,
    #[serde(default)]
    follow_up_queries: Vec<SearchQuery>,
}

impl SectionWriter {
    pub fn new(router: Arc<ModelRouter>, ctx: ProposalContext) -> Self {
        Self { router, ctx }
    }

    /// Draft the section, replacing any previous content
    ///
    /// A redraft sees its own earlier text through the prompt's current
    /// draft block, so revision happens in the model, not by merging here.
    pub async fn draft(&self, record: &mut SectionRecord) -> Result<()> {
        let system_prompt = Message::system(prompts::write_section(
            &record.spec,
            &record.content,
            &record.source_text,
            &self.ctx,
        ));
        let user_prompt =
            Message::user("Generate a report section based on the provided sources.");

        let response = self
            .router
            .generate(ModelRole::Writer, &[system_prompt, user_prompt])
            .await?;

        record.content = response.content;
        Ok(())
    }

    /// Grade the current draft against the section brief
    ///
    /// An unreadable grade counts as a failure with no follow-up queries;
    /// the retry budget still bounds how often that can repeat.
    pub async fn grade(&self, record: &SectionRecord) -> Result<SectionReview> {
        let system_prompt = Message::system(prompts::grade_section(
            &record.spec.description,
            &record.content,
        ));
        let user_prompt = Message::user(
            "Grade the report and consider follow-up questions for missing information:",
        );

        let response = self
            .router
            .generate(ModelRole::Grader, &[system_prompt, user_prompt])
            .await?;

        match parse_review(&response.content) {
            Some(review) => Ok(review),
            None => {
                tracing::warn!(
                    "Unreadable grade for section '{}', treating as fail",
                    record.spec.name
                );
                Ok(SectionReview {
                    grade: Grade::Fail,
                    follow_up_queries: Vec::new(),
                })
            }
        }
    }

    /// Write a section that synthesizes the assembled proposal
    ///
    /// Used for sections that skip research (introductions, summaries,
    /// conclusions). No grading pass applies.
    pub async fn write_final_section(
        &self,
        spec: &SectionSpec,
        assembled: &str,
    ) -> Result<String> {
        let system_prompt = Message::system(prompts::write_final_section(spec, assembled));
        let user_prompt = Message::user("Write the section based on the available proposal content.");

        let response = self
            .router
            .generate(ModelRole::Writer, &[system_prompt, user_prompt])
            .await?;

        Ok(response.content)
    }
}

/// Parse the grader's output, tolerating fenced or wrapped JSON
fn parse_review(content: &str) -> Option<SectionReview> {
    let json_str = first_json_object(content)?;
    let raw: RawSectionReview = serde_json::from_str(json_str).ok()?;

    let grade = if raw.grade.eq_ignore_ascii_case("pass") {
        Grade::Pass
    } else {
        Grade::Fail
    };

    Some(SectionReview {
        grade,
        follow_up_queries: raw
            .follow_up_queries
            .into_iter()
            .filter(|q| !q.is_empty())
            .collect(),
    })
}
