//! CLI interface for Quill
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for driving proposal drafting runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quill Grant Proposal Engine
///
/// A drafting assistant that plans a grant proposal, researches each section
/// against your document store, and writes, grades, and revises the sections
/// until the full proposal is assembled.
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draft a full grant proposal
    Draft {
        /// The project idea, as inline text or a path to a text file
        #[arg(long)]
        idea: String,

        /// The funder's requirements, as inline text or a path to a text file
        #[arg(long)]
        requirements: String,

        /// Write the proposal to this file instead of the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate and show the section plan without drafting
    Plan {
        /// The project idea, as inline text or a path to a text file
        #[arg(long)]
        idea: String,

        /// The funder's requirements, as inline text or a path to a text file
        #[arg(long)]
        requirements: String,
    },

    /// Run system diagnostics
    Doctor,
}
