//! Quill Engine Library
//!
//! This library provides the core functionality of the Quill engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Error types and user-facing hints
pub mod error;

/// Message bus for drafting-run observability
pub mod bus;

/// LLM provider abstraction layer
pub mod llm;

/// Document retrieval layer
pub mod retrieval;

/// Section drafting control loop
pub mod drafting;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
