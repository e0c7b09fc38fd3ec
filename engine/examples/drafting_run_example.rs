//! Example demonstrating a full proposal drafting run
//!
//! This example shows how to:
//! - Wire a model router, document source, and section writer together
//! - Subscribe to drafting events
//! - Run the drafting loop and print the assembled proposal
//!
//! Prerequisites:
//! - Ollama must be installed and running
//! - A model must be available (e.g., llama3.1:8b)
//!
//! Run with: cargo run --example drafting_run_example

use quill_engine::bus::{Event, EventType, MessageBus};
use quill_engine::config::DEFAULT_PROPOSAL_STRUCTURE;
use quill_engine::drafting::{
    DraftingEngine, ProposalContext, ResearchRetriever, ResearchSettings, SectionSpec,
    SectionWriter,
};
use quill_engine::llm::{ollama::OllamaProvider, LLMProvider, ModelRouter};
use quill_engine::retrieval::{Document, DocumentFilter, StaticSource};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Proposal Drafting Example ===\n");

    // One local model serves every role
    let provider: Arc<dyn LLMProvider> =
        Arc::new(OllamaProvider::new("http://localhost:11434", "llama3.1:8b"));

    if !provider.check_health().await {
        eprintln!("✗ Ollama is not reachable at http://localhost:11434");
        eprintln!("  Start it and pull a model first: ollama pull llama3.1:8b");
        return Err("Ollama is not reachable".into());
    }
    println!("✓ Model provider: {}", provider.name());

    let router = Arc::new(ModelRouter::new(
        vec![Arc::clone(&provider)],
        vec![Arc::clone(&provider)],
        vec![provider],
    ));

    // A small in-memory corpus stands in for the vector search service
    let source = StaticSource::new(vec![
        Document::new(
            "impact-2024",
            Some("2024 Impact Report".to_string()),
            "Riverbend Harvest distributed 1.2 million pounds of produce to 40 \
             partner pantries across three rural counties last year.",
        ),
        Document::new(
            "cold-chain-assessment",
            Some("Cold Chain Assessment".to_string()),
            "Without refrigerated transport, an estimated 30 percent of donated \
             produce spoils before it reaches a pantry shelf.",
        ),
    ]);

    let ctx = ProposalContext {
        project_idea: "A refrigerated van route serving rural food pantries".to_string(),
        funding_requirements: "Regional food security fund, awards up to $150k".to_string(),
        proposal_structure: DEFAULT_PROPOSAL_STRUCTURE.to_string(),
        user_name: "Jordan".to_string(),
        client_name: "Riverbend Harvest".to_string(),
        about_client: "A food bank serving three rural counties".to_string(),
    };

    let retriever = ResearchRetriever::new(
        Arc::clone(&router),
        Arc::new(source),
        DocumentFilter::Client("riverbend-harvest".to_string()),
        ctx.clone(),
        ResearchSettings {
            number_of_queries: 3,
            max_vector_results: 3,
            max_attempts: 2,
        },
    );
    let writer = SectionWriter::new(router, ctx);

    let specs = vec![
        SectionSpec::new(
            "Statement of Need",
            "Why rural pantries need refrigerated delivery",
            true,
        ),
        SectionSpec::new(
            "Executive Summary",
            "A one-paragraph overview of the request",
            false,
        ),
    ];

    // Subscribe before the engine takes the bus so no event is missed
    let bus = MessageBus::new();
    let mut events = bus.subscribe(EventType::All).await;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                Event::SectionStarted { section } => {
                    println!("  → researching \"{}\"", section);
                }
                Event::ResearchExhausted { section, attempts } => {
                    println!(
                        "  ⚠ no relevant documents for \"{}\" after {} attempts",
                        section, attempts
                    );
                }
                Event::SectionGraded {
                    section,
                    disposition,
                } => {
                    println!("  • \"{}\" graded: {}", section, disposition);
                }
                Event::ProposalFinalized { sections, chars } => {
                    println!("  ✓ finalized {} sections ({} chars)", sections, chars);
                }
            }
        }
    });

    println!("\nDrafting {} sections...\n", specs.len());

    let engine = DraftingEngine::new(specs, retriever, writer, bus, 2);
    let summary = engine.run().await?;
    let _ = printer.await;

    println!("\n=== Assembled Proposal ===\n");
    println!("{}", summary.proposal.trim_start());

    println!("\n=== Run {} Complete ===", summary.run_id);
    println!("Sections: {}", summary.sections);
    if !summary.forced_sections.is_empty() {
        println!("Accepted at retry budget: {:?}", summary.forced_sections);
    }

    Ok(())
}
