//! Type definitions module
//!
//! Wire payloads and results shared by the codec, aggregator and client.

pub mod options;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use options::{GenerationOptions, OptionValue};
pub use request::{CompletionRequest, GenerateRequest};
pub use response::{AggregatedResult, GenerationFragment, ModelList};
