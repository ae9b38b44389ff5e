//! Ollama generation client
//!
//! Public entry points for obtaining completions:
//! - `generate_lines`: streaming request, result split into suggestion lines
//! - `transform_text`: single-shot request, trimmed text with raw fallback
//! - `complete`: input-method call shape (instructions + target text)
//!
//! Base URL and model are resolved when the client is built, so an invalid
//! URL fails before any connection is attempted.

use super::aggregator::{aggregate, StreamPolicy};
use super::codec::{decode_fragment, encode_request};
use super::transport::TransportSession;
use crate::config::{self, ConnectionTarget, Settings, DEFAULT_MODEL};
use crate::errors::{ClientError, Result};
use crate::types::{
    AggregatedResult, CompletionRequest, GenerateRequest, GenerationOptions, ModelList,
};
use crate::discovery;
use std::time::Duration;
use tracing::{debug, info};

/// Generate endpoint path
pub const GENERATE_PATH: &str = "api/generate";

/// Inputs the host application supplies
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Call-time base URL override
    pub base_url: Option<String>,
    /// Base URL stored by the host application
    pub stored_base_url: Option<String>,
    pub model: Option<String>,
    pub options: GenerationOptions,
    /// Bounds one-shot requests, and each wait for data on a stream
    pub request_timeout: Option<Duration>,
    pub policy: StreamPolicy,
}

impl ClientSettings {
    /// Seed from a settings file; explicit fields set afterwards win
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: None,
            stored_base_url: settings.ollama.base_url.clone(),
            model: settings.ollama.model.clone(),
            options: settings.options.clone(),
            request_timeout: Some(settings.timeout()),
            policy: StreamPolicy::default(),
        }
    }
}

/// Ollama generation client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    transport: TransportSession,
    target: ConnectionTarget,
    model: String,
    options: GenerationOptions,
    policy: StreamPolicy,
}

impl OllamaClient {
    /// Create client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(config::DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    /// Create client for an explicit base URL and model
    pub fn with_config(base_url: &str, model: &str) -> Result<Self> {
        Self::from_settings(ClientSettings {
            base_url: Some(base_url.to_string()),
            model: Some(model.to_string()),
            request_timeout: Some(Duration::from_secs(config::DEFAULT_TIMEOUT_SECS)),
            ..ClientSettings::default()
        })
    }

    /// Resolve settings into a ready client
    pub fn from_settings(settings: ClientSettings) -> Result<Self> {
        let target = ConnectionTarget::resolve(
            settings.base_url.as_deref(),
            settings.stored_base_url.as_deref(),
        )?;
        let model = settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ClientError::Config("model name must not be empty".to_string()));
        }

        Ok(Self {
            transport: TransportSession::new(settings.request_timeout)?,
            target,
            model,
            options: settings.options,
            policy: settings.policy,
        })
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_policy(mut self, policy: StreamPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stream a generation and return the full aggregated result
    pub async fn generate(&self, request: &GenerateRequest) -> Result<AggregatedResult> {
        request.validate()?;
        let body = encode_request(request)?;

        let session = self.transport.open(&self.target, GENERATE_PATH, body).await?;
        let lines = session.require_success().await?;
        aggregate(lines, self.policy).await
    }

    /// Streaming generate, returning non-empty lines of generated text
    pub async fn generate_lines(&self, prompt: &str) -> Result<Vec<String>> {
        let request = self.build_request(&self.model, prompt, true);
        info!(model = %request.model, "streaming generate");

        let result = self.generate(&request).await?;
        if result.is_blank() {
            return Err(ClientError::NoResponse);
        }
        debug!(chars = result.text.chars().count(), "generation complete");
        Ok(result.lines())
    }

    /// Input-method completion: prompt and target joined by a newline
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let generate = self.build_request(model, &request.full_prompt(), true);
        info!(model = %generate.model, "completion request");

        let result = self.generate(&generate).await?;
        if result.is_blank() {
            return Err(ClientError::NoResponse);
        }
        Ok(result.lines())
    }

    /// Single-shot generate returning trimmed text
    ///
    /// A body that does not decode as a generate response is returned as
    /// text instead of failing.
    pub async fn transform_text(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(&self.model, prompt, false);
        request.validate()?;
        info!(model = %request.model, "single-shot transform");

        let body = encode_request(&request)?;
        let raw = self
            .transport
            .post_once(&self.target, GENERATE_PATH, body)
            .await?;

        let text = match decode_fragment(&raw) {
            Ok(fragment) => fragment.text().trim().to_string(),
            Err(e) => {
                debug!(error = %e, "response is not a generate object, returning raw body");
                String::from_utf8_lossy(&raw).into_owned()
            }
        };

        if text.trim().is_empty() {
            return Err(ClientError::NoResponse);
        }
        Ok(text)
    }

    /// Check that the server answers on its base URL
    pub async fn check_connection(&self) -> Result<bool> {
        discovery::check_connection(&self.transport, &self.target).await
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<ModelList> {
        discovery::list_models(&self.transport, &self.target).await
    }

    /// Get current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn transport(&self) -> &TransportSession {
        &self.transport
    }

    fn build_request(&self, model: &str, prompt: &str, stream: bool) -> GenerateRequest {
        let request = if stream {
            GenerateRequest::streaming(model, prompt)
        } else {
            GenerateRequest::single_shot(model, prompt)
        };
        request.with_options(self.options.clone())
    }
}
