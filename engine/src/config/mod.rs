//! Configuration management
//!
//! This module handles loading, validation, and management of the Quill
//! configuration. Configuration is stored in TOML format at
//! ~/.quill/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, output directory
//! - **llm**: Model role chains and per-provider settings
//! - **retrieval**: Vector search endpoint and scope
//! - **drafting**: Research and retry budgets, structure template
//! - **client**: Who the proposal is written for and by
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes the output directory, creating it if missing
//!
//! API keys are never stored here; providers read them from environment
//! variables (a `.env` file is honored at startup).
//!
//! # Examples
//!
//! ```no_run
//! use quill_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from default location
//! let config = Config::load_or_create()?;
//!
//! println!("Output dir: {:?}", config.core.output_dir);
//! println!("Planner chain: {:?}", config.llm.planner);
//! # Ok(())
//! # }
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Proposal structure used when no template file is configured
///
/// A condensed outline of the sections funders conventionally expect;
/// the planner treats it as guidance, not a fixed section list.
pub const DEFAULT_PROPOSAL_STRUCTURE: &str = "\
# Grant Proposal Template

## 1. Cover Page
Project title, applicant organization and contact details, funding agency
and grant program, submission date and project period.

## 2. Executive Summary
Organization mission and track record, concise project summary and the
need it addresses, funding amount requested and expected outcomes.

## 3. Statement of Need
Problem definition with supporting data and urgency, target population
demographics and evidence of need, gaps in existing services the project
fills.

## 4. Project Description and Implementation Plan
Goals with SMART objectives, scope of work and timeline with milestones,
partnerships and geographic scope, evaluation plan with data collection
methods.

## 5. Budget and Justification
Total cost with a categorized breakdown, matching funds or in-kind
contributions, line-item budget narrative tying each expense to project
activities.

## 6. Sustainability and Impact Measurement
Long-term viability and future funding sources, key performance
indicators with baselines and targets, community engagement and a
dissemination plan.

## 7. Appendices
Key personnel, letters of support, needs assessments, and evaluation
instruments.
";

/// Main configuration structure
///
/// Every section carries full defaults, so an empty file (or no file at
/// all) yields a working local configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Model role chains and provider settings
    #[serde(default)]
    pub llm: LLMConfig,

    /// Vector search settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Research and retry budgets
    #[serde(default)]
    pub drafting: DraftingConfig,

    /// Client and author identity
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            retrieval: RetrievalConfig::default(),
            drafting: DraftingConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory finished proposals are written to (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

/// Model role chains and per-provider settings
///
/// Each role lists provider names in failover order. Planning, drafting,
/// and grading can point at different providers (or all at the same one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Providers tried for section planning, in order
    #[serde(default = "default_role_chain")]
    pub planner: Vec<String>,

    /// Providers tried for query generation and drafting, in order
    #[serde(default = "default_role_chain")]
    pub writer: Vec<String>,

    /// Providers tried for relevance and section grading, in order
    #[serde(default = "default_role_chain")]
    pub grader: Vec<String>,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Anthropic provider settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            planner: default_role_chain(),
            writer: default_role_chain(),
            grader: default_role_chain(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from OPENAI_API_KEY, not from config
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Base URL for Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    // Note: API key comes from ANTHROPIC_API_KEY, not from config
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
        }
    }
}

/// Vector search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Base URL of the vector search service
    #[serde(default = "default_retrieval_endpoint")]
    pub endpoint: String,

    /// Collection to search within the service
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Documents requested per query
    #[serde(default = "default_max_vector_results")]
    pub max_vector_results: usize,

    /// Restrict research to these document ids instead of the client scope
    #[serde(default)]
    pub context_document_ids: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_retrieval_endpoint(),
            collection: default_collection(),
            max_vector_results: default_max_vector_results(),
            context_document_ids: Vec::new(),
        }
    }
}

/// Research and retry budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftingConfig {
    /// Search queries generated per section
    #[serde(default = "default_number_of_queries")]
    pub number_of_queries: usize,

    /// Failed-grade retries before a draft is accepted as-is
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: u32,

    /// Search-and-grade passes per research round; defaults to
    /// `max_search_depth` when unset
    #[serde(default)]
    pub max_retrieval_attempts: Option<u32>,

    /// Path to a proposal structure template (supports ~ expansion);
    /// a built-in template applies when unset
    #[serde(default)]
    pub structure_template: Option<PathBuf>,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            number_of_queries: default_number_of_queries(),
            max_search_depth: default_max_search_depth(),
            max_retrieval_attempts: None,
            structure_template: None,
        }
    }
}

impl DraftingConfig {
    /// Effective retrieval attempt ceiling
    pub fn retrieval_attempts(&self) -> u32 {
        self.max_retrieval_attempts.unwrap_or(self.max_search_depth)
    }
}

/// Client and author identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Identifier scoping retrieval to one client's documents
    #[serde(default)]
    pub client_id: String,

    /// Organization the proposal is written on behalf of
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Person the assistant is drafting for
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Background blurb about the client organization
    #[serde(default)]
    pub about_client: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_name: default_client_name(),
            user_name: default_user_name(),
            about_client: String::new(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("~/.quill/proposals")
}

fn default_role_chain() -> Vec<String> {
    vec!["openai".to_string()]
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_retrieval_endpoint() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_max_vector_results() -> usize {
    5
}

fn default_number_of_queries() -> usize {
    10
}

fn default_max_search_depth() -> u32 {
    2
}

fn default_client_name() -> String {
    "the client".to_string()
}

fn default_user_name() -> String {
    "the grant writer".to_string()
}

impl Config {
    /// Load configuration from the default location (~/.quill/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration. Validates the configuration after loading and
    /// returns descriptive errors if validation fails.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (invalid levels, unknown providers, bad paths)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, TOML parsing fails,
    /// or validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.quill/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".quill").join("config.toml"))
    }

    /// The proposal structure template for this run
    ///
    /// Reads the configured template file, or falls back to the built-in
    /// outline when none is set.
    pub fn proposal_structure(&self) -> Result<String, EngineError> {
        match &self.drafting.structure_template {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                EngineError::Config(format!(
                    "Failed to read structure template {:?}: {}",
                    path, e
                ))
            }),
            None => Ok(DEFAULT_PROPOSAL_STRUCTURE.to_string()),
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level and role chains
    /// - Validates the research fan-out settings
    /// - Expands ~ in paths
    /// - Canonicalizes the output directory, creating it if missing
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama", "openai", "anthropic"];
        for (role, chain) in [
            ("planner", &self.llm.planner),
            ("writer", &self.llm.writer),
            ("grader", &self.llm.grader),
        ] {
            if chain.is_empty() {
                return Err(EngineError::Config(format!(
                    "Role '{}' has no providers configured",
                    role
                )));
            }
            for provider in chain {
                if !valid_providers.contains(&provider.as_str()) {
                    return Err(EngineError::Config(format!(
                        "Unknown provider '{}' for role '{}'. Must be one of: {}",
                        provider,
                        role,
                        valid_providers.join(", ")
                    )));
                }
            }
        }

        if self.drafting.number_of_queries == 0 {
            return Err(EngineError::Config(
                "number_of_queries must be at least 1".to_string(),
            ));
        }
        if self.retrieval.max_vector_results == 0 {
            return Err(EngineError::Config(
                "max_vector_results must be at least 1".to_string(),
            ));
        }

        self.core.output_dir = expand_path(&self.core.output_dir)?;
        self.core.output_dir = canonicalize_or_create(&self.core.output_dir)?;

        if let Some(template) = &self.drafting.structure_template {
            self.drafting.structure_template = Some(expand_path(template)?);
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if path.exists() {
        path.canonicalize()
            .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
    } else {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;

        path.canonicalize()
            .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
    }
}
