//! Drafting System
//!
//! Orchestrates section planning, research, writing, and proposal assembly.

pub mod assembler;
pub mod engine;
pub mod planner;
pub mod prompts;
pub mod registry;
pub mod research;
pub mod types;
pub mod writer;

pub use assembler::ProposalAssembler;
pub use engine::{DraftingEngine, LoopState, RunSummary};
pub use planner::SectionPlanner;
pub use registry::SectionRegistry;
pub use research::{ResearchOutcome, ResearchRetriever, ResearchSettings};
pub use types::{ProposalContext, SectionRecord, SectionSpec};
pub use writer::{Grade, SectionReview, SectionWriter};
