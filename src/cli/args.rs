//! Command-line argument parsing for ollamastream
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ollamastream - stream Ollama pulls, chats and generations
#[derive(Parser, Debug)]
#[command(name = "ollamastream")]
#[command(version)]
#[command(about = "Stream Ollama pulls, chats and generations with live output", long_about = None)]
pub struct Args {
    /// Ollama model to use (overrides the configured default)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama host (overrides the configured host)
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port (overrides the configured port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a model with live progress
    Pull {
        /// Model name, e.g. llama3.1:8b
        name: String,
    },

    /// Delete a local model
    Delete {
        /// Model name
        name: String,
    },

    /// Generate a completion for a single prompt
    Generate {
        /// Prompt text
        prompt: String,

        /// System prompt
        #[arg(long)]
        system: Option<String>,
    },

    /// Interactive chat session
    Chat {
        /// System prompt
        #[arg(long)]
        system: Option<String>,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "ollamastream=debug,warn",
            Verbosity::VeryVerbose => "ollamastream=trace,debug",
        }
    }
}
