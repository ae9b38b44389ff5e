//! Error types for the Ollama completion client
//!
//! One enum covers the whole request lifecycle, from resolving the base URL
//! through decoding the final response.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Base URL or endpoint path could not be turned into a URL
    #[error("Invalid URL '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// Connection could not be established or the body could not be read
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Server answered with a status other than 200
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// JSON payload was malformed or missing a mandatory field
    #[error("Decode error: {reason} (raw: {raw})")]
    Decode { reason: String, raw: String },

    /// Option value has no wire representation
    #[error("Cannot encode option '{option}': unsupported value {value}")]
    Encoding { option: String, value: String },

    /// Exchange succeeded but produced no text
    #[error("Server returned an empty response")]
    NoResponse,

    /// Stream closed before a terminal fragment under a strict policy
    #[error("Stream ended without a completion marker ({} bytes received)", .partial.len())]
    IncompleteStream { partial: String },

    /// Line framing errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Build a decode error, truncating the raw payload for display
    pub fn decode(reason: impl Into<String>, raw: &[u8]) -> Self {
        const MAX_RAW: usize = 256;
        let raw = String::from_utf8_lossy(raw);
        let raw = match raw.char_indices().nth(MAX_RAW) {
            Some((idx, _)) => format!("{}...", &raw[..idx]),
            None => raw.into_owned(),
        };
        ClientError::Decode {
            reason: reason.into(),
            raw,
        }
    }

    /// True for failures a caller would report as "not connected"
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::UnexpectedStatus { .. }
        )
    }

    /// Map a reqwest send/read failure to a connection error
    pub(crate) fn connection(context: &str, err: reqwest::Error) -> Self {
        ClientError::Connection(format!("{}: {}", context, err))
    }
}
