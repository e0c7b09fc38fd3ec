//! Drafting control loop
//!
//! Drives each section through research, writing, and grading until the
//! registry has no work left, then synthesizes the remaining non-research
//! sections and emits the assembled proposal. One engine runs one
//! proposal; all section state lives in its registry.

use crate::bus::{Event, GradeDisposition, MessageBus};
use crate::drafting::assembler::ProposalAssembler;
use crate::drafting::registry::SectionRegistry;
use crate::drafting::research::{ResearchOutcome, ResearchRetriever};
use crate::drafting::types::SectionSpec;
use crate::drafting::writer::{Grade, SectionReview, SectionWriter};
use crate::error::EngineError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the loop stands between steps
///
/// `Finalized` is terminal; every other state performs one unit of work
/// per step and decides the next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Looking for the next section that needs research
    AwaitingClaim,

    /// Gathering graded documents for the active section
    Researching,

    /// Drafting the active section and grading the draft
    Writing,

    /// Deciding what to do with the latest grade
    Grading,

    /// A failed grade is consuming retry budget
    Retrying,

    /// The proposal has been assembled
    Finalized,
}

/// What a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,

    /// The assembled proposal text
    pub proposal: String,

    /// Sections appended to the proposal
    pub sections: usize,

    /// Sections accepted because their retry budget ran out
    pub forced_sections: Vec<String>,

    /// Sections that hit at least one empty research round
    pub exhausted_sections: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct DraftingEngine {
    registry: SectionRegistry,
    retriever: ResearchRetriever,
    writer: SectionWriter,
    assembler: ProposalAssembler,
    bus: MessageBus,
    max_search_depth: u32,
    state: LoopState,
    pending_review: Option<SectionReview>,
    forced_sections: Vec<String>,
    exhausted_sections: Vec<String>,
}

impl DraftingEngine {
    pub fn new(
        specs: Vec<SectionSpec>,
        retriever: ResearchRetriever,
        writer: SectionWriter,
        bus: MessageBus,
        max_search_depth: u32,
    ) -> Self {
        Self {
            registry: SectionRegistry::new(specs),
            retriever,
            writer,
            assembler: ProposalAssembler::new(),
            bus,
            max_search_depth,
            state: LoopState::AwaitingClaim,
            pending_review: None,
            forced_sections: Vec::new(),
            exhausted_sections: Vec::new(),
        }
    }

    /// Current loop state
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The section registry backing this run
    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    /// Drive the loop to completion and return the run summary
    pub async fn run(mut self) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        while self.state != LoopState::Finalized {
            self.step().await?;
        }

        let sections = self.assembler.sections();
        Ok(RunSummary {
            run_id,
            proposal: self.assembler.into_text(),
            sections,
            forced_sections: self.forced_sections,
            exhausted_sections: self.exhausted_sections,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Perform one state's work and return the state the loop moved to
    ///
    /// Stepping a finalized loop is a no-op.
    pub async fn step(&mut self) -> Result<LoopState> {
        match self.state {
            LoopState::AwaitingClaim => self.step_claim().await?,
            LoopState::Researching => self.step_research().await?,
            LoopState::Writing => self.step_write().await?,
            LoopState::Grading => self.step_grade().await?,
            LoopState::Retrying => self.step_retry().await?,
            LoopState::Finalized => {}
        }
        Ok(self.state)
    }

    async fn step_claim(&mut self) -> Result<()> {
        let Some(index) = self.registry.claim_next() else {
            return self.finalize().await;
        };

        let (name, description) = {
            let record = self.registry.record(index);
            (record.spec.name.clone(), record.spec.description.clone())
        };

        tracing::info!("Drafting section '{}'", name);
        self.bus
            .publish(Event::SectionStarted { section: name })
            .await;

        let queries = self.retriever.generate_queries(&description).await?;
        tracing::debug!("Generated {} search queries", queries.len());
        self.registry.record_mut(index).search_queries = queries;

        self.state = LoopState::Researching;
        Ok(())
    }

    async fn step_research(&mut self) -> Result<()> {
        let index = self
            .registry
            .active_index()
            .ok_or(EngineError::NoActiveSection)?;

        let outcome = {
            let record = self.registry.record_mut(index);
            self.retriever.research_section(record).await?
        };

        if let ResearchOutcome::Exhausted { attempts } = outcome {
            let name = self.registry.record(index).spec.name.clone();
            if !self.exhausted_sections.contains(&name) {
                self.exhausted_sections.push(name.clone());
            }
            self.bus
                .publish(Event::ResearchExhausted {
                    section: name,
                    attempts,
                })
                .await;
        }

        self.state = LoopState::Writing;
        Ok(())
    }

    async fn step_write(&mut self) -> Result<()> {
        let index = self
            .registry
            .active_index()
            .ok_or(EngineError::NoActiveSection)?;

        {
            let record = self.registry.record_mut(index);
            self.writer.draft(record).await?;
        }

        let review = self.writer.grade(self.registry.record(index)).await?;
        self.pending_review = Some(review);

        self.state = LoopState::Grading;
        Ok(())
    }

    async fn step_grade(&mut self) -> Result<()> {
        let index = self
            .registry
            .active_index()
            .ok_or(EngineError::NoActiveSection)?;
        let review = self
            .pending_review
            .take()
            .context("grading with no pending review")?;

        match review.grade {
            Grade::Pass => self.commit(GradeDisposition::Pass).await?,
            Grade::Fail
                if self.registry.record(index).search_iterations >= self.max_search_depth =>
            {
                // A zero retry budget accepts the first draft as written
                self.commit(GradeDisposition::Forced).await?;
            }
            Grade::Fail => {
                self.pending_review = Some(review);
                self.state = LoopState::Retrying;
            }
        }
        Ok(())
    }

    async fn step_retry(&mut self) -> Result<()> {
        let index = self
            .registry
            .active_index()
            .ok_or(EngineError::NoActiveSection)?;
        let review = self
            .pending_review
            .take()
            .context("retrying with no pending review")?;

        {
            let record = self.registry.record_mut(index);
            record.search_queries = review.follow_up_queries;
            record.search_iterations += 1;
        }

        let record = self.registry.record(index);
        if record.search_iterations >= self.max_search_depth {
            tracing::info!(
                "Retry budget spent for section '{}', accepting current draft",
                record.spec.name
            );
            self.commit(GradeDisposition::Forced).await?;
        } else {
            let name = record.spec.name.clone();
            tracing::debug!(
                "Section '{}' failed review, researching again (iteration {})",
                name,
                record.search_iterations
            );
            self.bus
                .publish(Event::SectionGraded {
                    section: name,
                    disposition: GradeDisposition::Fail,
                })
                .await;
            self.state = LoopState::Researching;
        }
        Ok(())
    }

    /// Retire the active section and append its content to the proposal
    async fn commit(&mut self, disposition: GradeDisposition) -> Result<()> {
        let index = self.registry.complete_active()?;

        let record = self.registry.record(index);
        let name = record.spec.name.clone();
        self.assembler.append(&record.content);

        if disposition == GradeDisposition::Forced {
            self.forced_sections.push(name.clone());
        }
        tracing::info!("Section '{}' committed ({})", name, disposition);
        self.bus
            .publish(Event::SectionGraded {
                section: name,
                disposition,
            })
            .await;

        if self.registry.has_unwritten_sections() {
            self.state = LoopState::AwaitingClaim;
        } else {
            self.finalize().await?;
        }
        Ok(())
    }

    /// Write any remaining non-research sections and close out the run
    ///
    /// Reached only when no unwritten research sections remain, so every
    /// record left is synthesized from the assembled proposal.
    async fn finalize(&mut self) -> Result<()> {
        for index in 0..self.registry.len() {
            if self.registry.record(index).is_written {
                continue;
            }

            let spec = self.registry.record(index).spec.clone();
            tracing::info!("Writing final section '{}'", spec.name);
            let content = self
                .writer
                .write_final_section(&spec, self.assembler.assembled())
                .await?;

            {
                let record = self.registry.record_mut(index);
                record.content = content;
                record.is_written = true;
            }
            self.assembler.append(&self.registry.record(index).content);
        }

        tracing::info!(
            "Proposal finalized with {} sections",
            self.assembler.sections()
        );
        self.bus
            .publish(Event::ProposalFinalized {
                sections: self.assembler.sections(),
                chars: self.assembler.assembled().chars().count(),
            })
            .await;

        self.state = LoopState::Finalized;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafting::research::ResearchSettings;
    use crate::drafting::types::ProposalContext;
    use crate::llm::{Completion, LLMProvider, Message, ModelRouter};
    use crate::retrieval::{DocumentFilter, StaticSource};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedProvider(&'static str);

    #[async_trait]
    impl LLMProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(&self, _messages: &[Message]) -> crate::llm::Result<Completion> {
            Ok(Completion::new(self.0))
        }
    }

    fn ctx() -> ProposalContext {
        ProposalContext {
            project_idea: "Mobile clinics".to_string(),
            funding_requirements: "Rural health grant".to_string(),
            proposal_structure: "Standard".to_string(),
            user_name: "Dana".to_string(),
            client_name: "Prairie Health".to_string(),
            about_client: "Nonprofit".to_string(),
        }
    }

    fn engine_for(specs: Vec<SectionSpec>, writer_reply: &'static str) -> DraftingEngine {
        let writer: Arc<dyn LLMProvider> = Arc::new(FixedProvider(writer_reply));
        let router = Arc::new(ModelRouter::new(vec![], vec![writer], vec![]));
        let retriever = ResearchRetriever::new(
            Arc::clone(&router),
            Arc::new(StaticSource::empty()),
            DocumentFilter::Client("prairie".to_string()),
            ctx(),
            ResearchSettings::default(),
        );
        let writer = SectionWriter::new(router, ctx());
        DraftingEngine::new(specs, retriever, writer, MessageBus::new(), 2)
    }

    #[tokio::test]
    async fn test_empty_plan_finalizes_immediately() {
        let engine = engine_for(vec![], "unused");

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.proposal, "");
        assert_eq!(summary.sections, 0);
        assert!(summary.forced_sections.is_empty());
    }

    #[tokio::test]
    async fn test_non_research_plan_is_written_at_finalization() {
        let specs = vec![SectionSpec::new("Executive Summary", "Summarize", false)];
        let engine = engine_for(specs, "# Summary\n\nThe ask.");

        let summary = engine.run().await.unwrap();

        assert_eq!(summary.sections, 1);
        assert_eq!(summary.proposal, "\n\n# Summary\n\nThe ask.");
    }

    #[tokio::test]
    async fn test_step_on_finalized_engine_is_a_no_op() {
        let mut engine = engine_for(vec![], "unused");

        assert_eq!(engine.step().await.unwrap(), LoopState::Finalized);
        assert_eq!(engine.step().await.unwrap(), LoopState::Finalized);
    }
}
