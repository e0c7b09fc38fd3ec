// Quill Grant Proposal Engine
// Main entry point for the quill binary

use clap::Parser;
use quill_engine::cli::{Cli, Command};
use quill_engine::config::Config;
use quill_engine::error::hint_for;
use quill_engine::handlers::{handle_doctor, handle_draft, handle_plan, OutputFormat};
use quill_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load API keys from a local .env file when present
    dotenv::dotenv().ok();

    // Initialize basic telemetry first (before config is loaded)
    init_telemetry();

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Quill Engine v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize telemetry with the CLI override or config-driven level
    // (only takes effect if RUST_LOG env var is not set)
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    // Handle commands
    let result = match cli.command {
        Command::Draft {
            idea,
            requirements,
            output,
        } => {
            tracing::info!("Drafting proposal for: {}", idea);
            handle_draft(idea, requirements, output, &config, format).await
        }

        Command::Plan { idea, requirements } => {
            tracing::info!("Planning proposal for: {}", idea);
            handle_plan(idea, requirements, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    };

    if let Err(ref err) = result {
        if let Some(hint) = hint_for(err) {
            eprintln!("Hint: {}", hint);
        }
    }

    result
}
