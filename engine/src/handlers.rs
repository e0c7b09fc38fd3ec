//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - draft: Plan, research, write, and assemble a full proposal
//! - plan: Show the generated section plan without drafting
//! - doctor: Validate configuration and check dependencies

use anyhow::{Context, Result};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bus::{Event, EventType, GradeDisposition, MessageBus};
use crate::config::{Config, LLMConfig};
use crate::drafting::{
    DraftingEngine, ProposalContext, ResearchRetriever, ResearchSettings, SectionPlanner,
    SectionWriter,
};
use crate::error::EngineError;
use crate::llm::anthropic::AnthropicProvider;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::router::ModelRouter;
use crate::llm::LLMProvider;
use crate::retrieval::http::HttpVectorSource;
use crate::retrieval::{DocumentFilter, DocumentSource};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Instantiate one provider by its config name
///
/// Cloud providers whose API key is not in the environment are skipped
/// with a warning, so the rest of the chain can still serve the role.
fn instantiate_provider(name: &str, llm: &LLMConfig) -> Option<Arc<dyn LLMProvider>> {
    match name {
        "ollama" => Some(Arc::new(OllamaProvider::new(
            llm.ollama.base_url.clone(),
            llm.ollama.model.clone(),
        ))),
        "openai" => {
            if std::env::var("OPENAI_API_KEY").is_err() {
                tracing::warn!("Skipping openai provider: OPENAI_API_KEY not set");
                return None;
            }
            Some(Arc::new(OpenAIProvider::new(
                llm.openai.base_url.clone(),
                llm.openai.model.clone(),
            )))
        }
        "anthropic" => {
            if std::env::var("ANTHROPIC_API_KEY").is_err() {
                tracing::warn!("Skipping anthropic provider: ANTHROPIC_API_KEY not set");
                return None;
            }
            Some(Arc::new(AnthropicProvider::new(
                llm.anthropic.base_url.clone(),
                llm.anthropic.model.clone(),
            )))
        }
        other => {
            tracing::warn!("Unknown provider '{}' in config, skipping", other);
            None
        }
    }
}

fn build_chain(
    role: &str,
    names: &[String],
    llm: &LLMConfig,
    cache: &mut HashMap<String, Arc<dyn LLMProvider>>,
) -> Result<Vec<Arc<dyn LLMProvider>>> {
    let mut chain = Vec::new();
    for name in names {
        if let Some(provider) = cache.get(name.as_str()) {
            chain.push(Arc::clone(provider));
            continue;
        }
        if let Some(provider) = instantiate_provider(name, llm) {
            cache.insert(name.clone(), Arc::clone(&provider));
            chain.push(provider);
        }
    }
    if chain.is_empty() {
        anyhow::bail!(
            "No usable providers for the {} role. Add ollama to llm.{}, or set the API key \
             for a configured cloud provider",
            role,
            role
        );
    }
    Ok(chain)
}

/// Build the model router from the configured role chains
///
/// A provider named in several chains is constructed once and shared.
pub fn build_model_router(config: &Config) -> Result<ModelRouter> {
    let mut cache: HashMap<String, Arc<dyn LLMProvider>> = HashMap::new();
    let planner = build_chain("planner", &config.llm.planner, &config.llm, &mut cache)?;
    let writer = build_chain("writer", &config.llm.writer, &config.llm, &mut cache)?;
    let grader = build_chain("grader", &config.llm.grader, &config.llm, &mut cache)?;
    Ok(ModelRouter::new(planner, writer, grader))
}

/// Resolve the retrieval scope for a run
///
/// An explicit document allow-list takes precedence over the client scope.
pub fn build_document_filter(config: &Config) -> Result<DocumentFilter, EngineError> {
    if !config.retrieval.context_document_ids.is_empty() {
        return Ok(DocumentFilter::Ids(
            config.retrieval.context_document_ids.clone(),
        ));
    }
    if !config.client.client_id.is_empty() {
        return Ok(DocumentFilter::Client(config.client.client_id.clone()));
    }
    Err(EngineError::RetrievalScopeMissing)
}

/// Treat a CLI input as a file path when it names one, inline text otherwise
fn resolve_input(raw: String) -> Result<String> {
    let path = Path::new(&raw);
    if path.is_file() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(text.trim().to_string());
    }
    Ok(raw)
}

fn build_context(idea: String, requirements: String, config: &Config) -> Result<ProposalContext> {
    Ok(ProposalContext {
        project_idea: resolve_input(idea)?,
        funding_requirements: resolve_input(requirements)?,
        proposal_structure: config.proposal_structure()?,
        user_name: config.client.user_name.clone(),
        client_name: config.client.client_name.clone(),
        about_client: config.client.about_client.clone(),
    })
}

/// Draft a full grant proposal
///
/// Plans the sections, runs the research/write/grade loop over each one,
/// and writes the assembled proposal to disk.
pub async fn handle_draft(
    idea: String,
    requirements: String,
    output: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let router = Arc::new(build_model_router(config)?);
    let filter = build_document_filter(config)?;
    let source: Arc<dyn DocumentSource> = Arc::new(HttpVectorSource::new(
        config.retrieval.endpoint.clone(),
        config.retrieval.collection.clone(),
    ));
    let ctx = build_context(idea.clone(), requirements, config)?;

    match format {
        OutputFormat::Text => {
            println!("Drafting proposal: {}", idea);
            println!();
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "running",
                "idea": idea,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    let planner = SectionPlanner::new(Arc::clone(&router));
    let specs = planner.generate_plan(&ctx).await?;

    if matches!(format, OutputFormat::Text) {
        println!("Planned {} sections:", specs.len());
        for spec in &specs {
            let marker = if spec.requires_research {
                ""
            } else {
                " (no research)"
            };
            println!("  - {}{}", spec.name, marker);
        }
        println!();
    }

    let settings = ResearchSettings {
        number_of_queries: config.drafting.number_of_queries,
        max_vector_results: config.retrieval.max_vector_results,
        max_attempts: config.drafting.retrieval_attempts(),
    };
    let retriever = ResearchRetriever::new(
        Arc::clone(&router),
        source,
        filter,
        ctx.clone(),
        settings,
    );
    let writer = SectionWriter::new(router, ctx);

    // Subscribe before the engine takes the bus; the receiver closes when
    // the finished engine drops its half.
    let bus = MessageBus::new();
    let mut events = bus.subscribe(EventType::All).await;
    let progress = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_progress(&event, format);
        }
    });

    let engine = DraftingEngine::new(
        specs,
        retriever,
        writer,
        bus,
        config.drafting.max_search_depth,
    );
    let summary = engine.run().await?;
    let _ = progress.await;

    let path = match output {
        Some(path) => path,
        None => config
            .core
            .output_dir
            .join(format!("proposal-{}.md", summary.run_id)),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    let proposal = summary.proposal.trim_start();
    std::fs::write(&path, proposal)
        .with_context(|| format!("Failed to write proposal to {:?}", path))?;

    let duration_ms = (summary.finished_at - summary.started_at).num_milliseconds();
    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", proposal);
            println!();
            println!("✓ Proposal assembled");
            println!("  Sections: {}", summary.sections);
            if !summary.forced_sections.is_empty() {
                println!(
                    "  Accepted at retry budget: {}",
                    summary.forced_sections.join(", ")
                );
            }
            if !summary.exhausted_sections.is_empty() {
                println!(
                    "  Thin research: {}",
                    summary.exhausted_sections.join(", ")
                );
            }
            println!("  Duration: {}ms", duration_ms);
            println!("  Written to: {}", path.display());
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "completed",
                "run_id": summary.run_id,
                "sections": summary.sections,
                "forced_sections": summary.forced_sections,
                "exhausted_sections": summary.exhausted_sections,
                "started_at": summary.started_at,
                "finished_at": summary.finished_at,
                "duration_ms": duration_ms,
                "output_path": path,
                "proposal": proposal,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_progress(event: &Event, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        return;
    }
    match event {
        Event::SectionStarted { section } => {
            println!("Drafting section: {}", section);
        }
        Event::ResearchExhausted { section: _, attempts } => {
            println!("  (no relevant documents after {} attempts)", attempts);
        }
        Event::SectionGraded { disposition, .. } => match disposition {
            GradeDisposition::Pass => println!("  ✓ graded pass"),
            GradeDisposition::Fail => println!("  ✗ graded fail, retrying"),
            GradeDisposition::Forced => println!("  ⚠ accepted at retry budget"),
        },
        Event::ProposalFinalized { sections, chars } => {
            println!("Assembled {} sections ({} chars)", sections, chars);
        }
    }
}

/// Generate and show the section plan without drafting
pub async fn handle_plan(
    idea: String,
    requirements: String,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let router = Arc::new(build_model_router(config)?);
    let ctx = build_context(idea, requirements, config)?;

    let planner = SectionPlanner::new(router);
    let specs = planner.generate_plan(&ctx).await?;

    match format {
        OutputFormat::Text => {
            println!("Proposal plan ({} sections):", specs.len());
            println!();
            for (i, spec) in specs.iter().enumerate() {
                let marker = if spec.requires_research {
                    ""
                } else {
                    " (no research)"
                };
                println!("{}. {}{}", i + 1, spec.name, marker);
                for line in spec.description.lines() {
                    println!("   {}", line);
                }
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "sections": specs,
                "count": specs.len()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run system diagnostics
///
/// This handler validates the configuration, checks the retrieval scope,
/// probes the search service and all configured providers, and reports
/// any issues.
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Check 1: Configuration validation
    // Config is already validated when loaded
    checks.push(("Configuration".to_string(), "Valid".to_string()));

    // Check 2: Output directory
    if config.core.output_dir.exists() {
        checks.push(("Output directory".to_string(), "Exists".to_string()));
    } else {
        checks.push(("Output directory".to_string(), "Missing".to_string()));
        issues.push(format!(
            "Output directory does not exist: {:?}",
            config.core.output_dir
        ));
    }

    // Check 3: Structure template
    match &config.drafting.structure_template {
        Some(path) if path.exists() => {
            checks.push(("Structure template".to_string(), "Exists".to_string()));
        }
        Some(path) => {
            checks.push(("Structure template".to_string(), "Missing".to_string()));
            issues.push(format!("Structure template does not exist: {:?}", path));
        }
        None => {
            checks.push(("Structure template".to_string(), "Built-in".to_string()));
        }
    }

    // Check 4: Retrieval scope
    match build_document_filter(config) {
        Ok(DocumentFilter::Ids(ids)) => {
            checks.push((
                "Retrieval scope".to_string(),
                format!("{} document ids", ids.len()),
            ));
        }
        Ok(DocumentFilter::Client(client_id)) => {
            checks.push(("Retrieval scope".to_string(), format!("client {}", client_id)));
        }
        Err(_) => {
            checks.push(("Retrieval scope".to_string(), "Not configured".to_string()));
            issues.push(
                "No retrieval scope. Set retrieval.context_document_ids or client.client_id"
                    .to_string(),
            );
        }
    }

    // Check 5: Search service
    let source = HttpVectorSource::new(
        config.retrieval.endpoint.clone(),
        config.retrieval.collection.clone(),
    );
    if source.check_health().await {
        checks.push(("Search service".to_string(), "Available".to_string()));
    } else {
        checks.push(("Search service".to_string(), "Not available".to_string()));
        issues.push(format!(
            "Search service is not reachable at {}",
            config.retrieval.endpoint
        ));
    }

    // Check 6: Model providers
    match build_model_router(config) {
        Ok(router) => {
            let health = router.check_health().await;
            let mut any_healthy = false;
            for (name, healthy) in health {
                if healthy {
                    any_healthy = true;
                    checks.push((format!("Provider {}", name), "Available".to_string()));
                } else {
                    checks.push((format!("Provider {}", name), "Not available".to_string()));
                    issues.push(format!("Provider {} failed its health check", name));
                }
            }
            if !any_healthy {
                issues.push(
                    "No model providers available. Configure at least one provider.".to_string(),
                );
            }
        }
        Err(e) => {
            checks.push(("Model providers".to_string(), "Not configured".to_string()));
            issues.push(e.to_string());
        }
    }

    // Output results
    match format {
        OutputFormat::Text => {
            println!("Quill System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(ids: Vec<String>, client_id: &str) -> Config {
        let mut config = Config::default();
        config.retrieval.context_document_ids = ids;
        config.client.client_id = client_id.to_string();
        config
    }

    #[test]
    fn test_document_filter_prefers_explicit_ids() {
        let config = config_with(vec!["doc-1".to_string()], "acme");
        let filter = build_document_filter(&config).unwrap();
        assert_eq!(filter, DocumentFilter::Ids(vec!["doc-1".to_string()]));
    }

    #[test]
    fn test_resolve_input_passes_inline_text_through() {
        let text = "Mobile clinics for the county".to_string();
        assert_eq!(resolve_input(text.clone()).unwrap(), text);
    }

    #[test]
    fn test_resolve_input_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idea.txt");
        fs::write(&path, "Refrigerated delivery routes\n").unwrap();

        let resolved = resolve_input(path.to_string_lossy().into_owned()).unwrap();
        assert_eq!(resolved, "Refrigerated delivery routes");
    }

    #[test]
    fn test_document_filter_falls_back_to_client() {
        let config = config_with(Vec::new(), "acme");
        let filter = build_document_filter(&config).unwrap();
        assert_eq!(filter, DocumentFilter::Client("acme".to_string()));
    }

    #[test]
    fn test_document_filter_requires_some_scope() {
        let config = config_with(Vec::new(), "");
        let result = build_document_filter(&config);
        assert!(matches!(result, Err(EngineError::RetrievalScopeMissing)));
    }

    #[test]
    fn test_build_chain_skips_unknown_providers() {
        let llm = LLMConfig::default();
        let mut cache = HashMap::new();
        let names = vec!["no-such-provider".to_string(), "ollama".to_string()];

        let chain = build_chain("writer", &names, &llm, &mut cache).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "ollama");
    }

    #[test]
    fn test_build_chain_errors_when_nothing_usable() {
        let llm = LLMConfig::default();
        let mut cache = HashMap::new();
        let names = vec!["no-such-provider".to_string()];

        let result = build_chain("grader", &names, &llm, &mut cache);
        assert!(result.is_err());
    }

    #[test]
    fn test_chains_share_provider_instances() {
        let llm = LLMConfig::default();
        let mut cache = HashMap::new();
        let names = vec!["ollama".to_string()];

        let first = build_chain("planner", &names, &llm, &mut cache).unwrap();
        let second = build_chain("writer", &names, &llm, &mut cache).unwrap();
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }
}
