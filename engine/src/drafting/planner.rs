//! Section Planner
//!
//! Interacts with the planner model to turn the project idea, funding
//! requirements, and proposal structure into an ordered list of
//! `SectionSpec`s for the drafting loop.

use crate::drafting::prompts;
use crate::drafting::types::{ProposalContext, SectionSpec};
use crate::llm::{first_json_array, Message, ModelRole, ModelRouter};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;

pub struct SectionPlanner {
    router: Arc<ModelRouter>,
}

/// Intermediate deserialization type for LLM JSON output
#[derive(Debug, Deserialize)]
struct RawSection {
    name: String,
    description: String,
    #[serde(default = "default_research")]
    research: bool,
}

fn default_research() -> bool {
    true
}

impl SectionPlanner {
    pub fn new(router: Arc<ModelRouter>) -> Self {
        Self { router }
    }

    /// Generate the section plan for a proposal
    pub async fn generate_plan(&self, ctx: &ProposalContext) -> Result<Vec<SectionSpec>> {
        let system_prompt = Message::system(prompts::plan_sections(ctx));
        let user_prompt = Message::user("Generate the sections of the grant proposal.");

        let response = self
            .router
            .generate(ModelRole::Planner, &[system_prompt, user_prompt])
            .await?;

        match self.parse_sections(&response.content) {
            Ok(sections) if !sections.is_empty() => Ok(sections),
            _ => {
                tracing::warn!("Failed to parse section plan output, using default plan");
                Ok(self.default_plan())
            }
        }
    }

    /// Parse LLM output into SectionSpecs, handling various JSON formats
    fn parse_sections(&self, content: &str) -> Result<Vec<SectionSpec>> {
        let json_str = first_json_array(content).unwrap_or_else(|| content.trim());

        let raw_sections: Vec<RawSection> =
            serde_json::from_str(json_str).context("Failed to parse section plan JSON")?;

        let sections = raw_sections
            .into_iter()
            .map(|raw| SectionSpec::new(raw.name, raw.description, raw.research))
            .collect();

        Ok(sections)
    }

    /// Fixed six-section plan used when LLM parsing fails
    fn default_plan(&self) -> Vec<SectionSpec> {
        vec![
            SectionSpec::new(
                "Executive Summary",
                "A concise overview of the project, the funding request, and the expected impact.",
                false,
            ),
            SectionSpec::new(
                "Statement of Need",
                "Evidence of the problem the project addresses, grounded in data about the community served.",
                true,
            ),
            SectionSpec::new(
                "Project Description",
                "The activities, timeline, and delivery approach of the proposed project.",
                true,
            ),
            SectionSpec::new(
                "Goals and Objectives",
                "Measurable goals tied to the funder's priorities, with objectives and success metrics.",
                true,
            ),
            SectionSpec::new(
                "Budget Narrative",
                "A justification of the requested funds mapped to project activities and outcomes.",
                true,
            ),
            SectionSpec::new(
                "Conclusion",
                "A synthesis of the proposal's case for support and the partnership ahead.",
                false,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> SectionPlanner {
        SectionPlanner::new(Arc::new(ModelRouter::new(vec![], vec![], vec![])))
    }

    #[test]
    fn test_parse_sections_valid_json() {
        let json = r#"[
            {"name": "Statement of Need", "description": "Show the gap", "research": true},
            {"name": "Executive Summary", "description": "Summarize", "research": false}
        ]"#;

        let sections = planner().parse_sections(json).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "Statement of Need");
        assert!(sections[0].requires_research);
        assert!(!sections[1].requires_research);
    }

    #[test]
    fn test_parse_sections_with_markdown_wrapper() {
        let json = r#"Here is the plan:
        ```json
        [{"name": "Budget", "description": "Justify the ask"}]
        ```
        Hope this helps!"#;

        let sections = planner().parse_sections(json).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Budget");
    }

    #[test]
    fn test_parse_sections_research_defaults_true() {
        let json = r#"[{"name": "Methods", "description": "How we deliver"}]"#;

        let sections = planner().parse_sections(json).unwrap();
        assert!(sections[0].requires_research);
    }

    #[test]
    fn test_parse_sections_rejects_non_json() {
        assert!(planner().parse_sections("no structure here").is_err());
    }

    #[test]
    fn test_default_plan_shape() {
        let plan = planner().default_plan();
        assert_eq!(plan.len(), 6);
        assert!(!plan[0].requires_research);
        assert!(!plan[5].requires_research);
        assert_eq!(plan.iter().filter(|s| s.requires_research).count(), 4);
    }
}
