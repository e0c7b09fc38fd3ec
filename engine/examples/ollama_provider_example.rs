//! Example demonstrating the Ollama LLM provider
//!
//! This example shows how to use the OllamaProvider to interact with a local Ollama instance.
//!
//! Prerequisites:
//! - Ollama must be installed and running (https://ollama.ai)
//! - A model must be pulled (e.g., `ollama pull llama3.1:8b`)
//!
//! Run with: cargo run --example ollama_provider_example

use quill_engine::llm::{ollama::OllamaProvider, LLMProvider, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ollama Provider Example ===\n");

    let provider = OllamaProvider::new("http://localhost:11434", "llama3.1:8b");

    println!("Provider: {}", provider.name());
    println!("Is Local: {}\n", provider.is_local());

    // Check if Ollama is running
    println!("Checking if Ollama is available...");
    if !provider.check_health().await {
        eprintln!("✗ Failed to connect to Ollama");
        eprintln!("\nMake sure Ollama is running:");
        eprintln!("  1. Install Ollama from https://ollama.ai");
        eprintln!("  2. Pull a model: ollama pull llama3.1:8b");
        eprintln!("  3. Ollama should start automatically");
        return Err("Ollama is not reachable".into());
    }
    println!("✓ Ollama is running and responsive\n");

    println!("=== Completion Example ===\n");

    let messages = vec![
        Message::system("You are a grant writer who answers in one short paragraph."),
        Message::user("Why do funders ask for a statement of need?"),
    ];

    println!("User: {}", messages[1].content);

    let completion = provider.generate(&messages).await?;
    println!("Assistant: {}", completion.content);

    println!("\n=== Example Complete ===");

    Ok(())
}
