//! Streaming client module
//!
//! Provides the generate client, the wire codec, the HTTP transport and the
//! fragment aggregator.

pub mod aggregator;
pub mod client;
pub mod codec;
pub mod lines;
pub mod transport;

// Re-export commonly used types
pub use aggregator::{aggregate, Aggregator, StreamPolicy};
pub use client::{ClientSettings, OllamaClient, GENERATE_PATH};
pub use lines::{LineBuffer, LineStream, MAX_LINE_BYTES};
pub use transport::{StreamSession, TransportSession};
