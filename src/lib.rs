//! ollama-ime - Ollama completion client for input methods
//!
//! Obtains conversion suggestions from a local Ollama server.
//!
//! # Architecture
//!
//! - **types**: request, fragment and result payloads
//! - **streaming**: wire codec, HTTP transport, fragment aggregation, client
//! - **discovery**: liveness probe and model listing
//! - **config**: base URL resolution and read-only settings

pub mod errors;
pub mod types;
pub mod config;
pub mod streaming;
pub mod discovery;
pub mod cli;

// Re-export commonly used types
pub use errors::{ClientError, Result};
pub use config::ConnectionTarget;
pub use streaming::{OllamaClient, StreamPolicy};
