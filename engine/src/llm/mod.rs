//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for interacting with multiple LLM providers
//! (Ollama, OpenAI, Anthropic). The LLMProvider trait defines the contract that all
//! providers must implement, enabling the model router to work with multiple providers
//! transparently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QuillErrorExt;

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod router;

pub use router::{ModelRole, ModelRouter};

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl QuillErrorExt for LLMError {
    fn user_hint(&self) -> &str {
        match self {
            Self::ProviderUnavailable(_) => "Model provider unreachable. Check it is running",
            Self::AuthenticationFailed(_) => "Authentication failed. Check your API key",
            Self::RateLimitExceeded => "Rate limit exceeded. Wait a moment and retry",
            Self::InvalidRequest(_) => "Provider rejected the request. Check the model name",
            Self::NetworkError(_) => "Network error talking to the provider",
            Self::Timeout => "Model took too long to respond. Try again",
            Self::ParseError(_) => "Could not parse the model response. Try again",
            Self::Unknown(_) => "Model call failed. Check logs for details",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::AuthenticationFailed(_))
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Completion returned by an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,
}

impl Completion {
    /// Create a new completion
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai", "anthropic")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama), false for cloud providers
    fn is_local(&self) -> bool;

    /// Generate a completion from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation history including system prompt and user messages
    ///
    /// # Returns
    /// * `Ok(Completion)` - The generated text
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message]) -> Result<Completion>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Extract the first JSON object from LLM output.
///
/// Handles multiple output formats:
/// 1. Raw JSON: the entire (trimmed) content is an object
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. JSON embedded in prose: scans for the first `{` and balances braces
pub fn first_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') {
        if let Some(obj) = extract_balanced(trimmed, '{', '}') {
            return Some(obj);
        }
    }

    if let Some(inner) = extract_fenced_block(trimmed) {
        let inner = inner.trim();
        if let Some(obj) = extract_balanced(inner, '{', '}') {
            return Some(obj);
        }
    }

    let pos = trimmed.find('{')?;
    extract_balanced(&trimmed[pos..], '{', '}')
}

/// Extract the first JSON array from LLM output.
///
/// Same format handling as [`first_json_object`], for `[...]` payloads
/// (query lists, section plans).
pub fn first_json_array(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if trimmed.starts_with('[') {
        if let Some(arr) = extract_balanced(trimmed, '[', ']') {
            return Some(arr);
        }
    }

    if let Some(inner) = extract_fenced_block(trimmed) {
        let inner = inner.trim();
        if let Some(arr) = extract_balanced(inner, '[', ']') {
            return Some(arr);
        }
    }

    let pos = trimmed.find('[')?;
    extract_balanced(&trimmed[pos..], '[', ']')
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
/// Returns `None` if no fenced block is found.
fn extract_fenced_block(content: &str) -> Option<&str> {
    // Find opening fence
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    // Find closing fence after the body starts
    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced `open`...`close` span starting at position 0 of `s`.
///
/// Counts bracket depth, respecting string literals, to find the
/// matching close bracket.
fn extract_balanced(s: &str, open: char, close: char) -> Option<&str> {
    if !s.starts_with(open) {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
