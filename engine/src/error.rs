//! Error types and handling
//!
//! This module provides the error types used throughout the Quill engine.
//! All errors implement the `QuillErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Error messages are safe to display to end users: no API keys, no tokens,
//! no internal implementation details.

use thiserror::Error;

/// Trait for Quill error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait QuillErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require a configuration change first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// This enum represents the errors that can occur in the Quill engine outside
/// of the LLM and retrieval layers, which carry their own error types.
///
/// # Examples
///
/// ```
/// use quill_engine::error::{EngineError, QuillErrorExt};
///
/// let error = EngineError::NoActiveSection;
/// println!("Hint: {}", error.user_hint());
/// assert!(!error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Drafting loop errors
    #[error("No section is active")]
    NoActiveSection,

    #[error("No retrieval scope configured")]
    RetrievalScopeMissing,

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuillErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::PathCanonicalization(_, _) => "Invalid path specified",
            Self::NoActiveSection => "No section is in progress. This is a bug",
            Self::RetrievalScopeMissing => {
                "Set context_document_ids or client_id in config.toml"
            }
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // A loop sequencing violation cannot be retried into working
            Self::NoActiveSection => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

/// Look up a user-facing hint for any error surfaced through `anyhow`.
///
/// Walks the downcast candidates that implement [`QuillErrorExt`] and
/// returns the first match, or `None` for foreign errors.
pub fn hint_for(err: &anyhow::Error) -> Option<&str> {
    if let Some(e) = err.downcast_ref::<EngineError>() {
        return Some(e.user_hint());
    }
    if let Some(e) = err.downcast_ref::<crate::llm::LLMError>() {
        return Some(e.user_hint());
    }
    if let Some(e) = err.downcast_ref::<crate::retrieval::RetrievalError>() {
        return Some(e.user_hint());
    }
    None
}
