//! Command-line argument parsing for ollama-ime
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable consulted when no base URL is configured
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

/// ollama-ime - Conversion suggestions from a local Ollama server
#[derive(Parser, Debug)]
#[command(name = "ollama-ime")]
#[command(version)]
#[command(about = "Request input-method suggestions from a local Ollama server", long_about = None)]
pub struct Args {
    /// Ollama base URL (overrides config file and OLLAMA_HOST)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Ollama model to use
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Fail when the stream ends without a completion marker
    #[arg(long, global = true)]
    pub strict: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Check that the Ollama server is reachable
    Check,

    /// List available Ollama models
    Models,

    /// Stream a generation and print one suggestion per line
    Generate {
        /// Prompt text
        prompt: String,
    },

    /// Single-shot transformation of a prompt
    Transform {
        /// Prompt text
        prompt: String,
    },

    /// Input-method completion: instructions plus the text to convert
    Complete {
        /// Instructions for the model
        prompt: String,

        /// Text being converted
        #[arg(short, long)]
        target: String,
    },
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

    /// Base URL from the environment, used below the config file value
    pub fn env_base_url() -> Option<String> {
        std::env::var(OLLAMA_HOST_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| {
                if v.contains("://") {
                    v
                } else {
                    format!("http://{}", v)
                }
            })
    }
}

impl Verbosity {
    /// Default `tracing` filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "ollama_ime=info",
            Verbosity::Verbose => "ollama_ime=debug",
            Verbosity::VeryVerbose => "ollama_ime=trace,reqwest=debug",
        }
    }

    /// Check if should show status messages
    pub fn show_status(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}
