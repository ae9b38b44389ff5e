//! Request payloads for the generate endpoint

use super::options::{GenerationOptions, OptionValue};
use crate::errors::{ClientError, Result};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    /// Absent means "use server defaults"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

impl GenerateRequest {
    /// Request whose response arrives as newline-delimited fragments
    pub fn streaming(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            options: None,
        }
    }

    /// Request answered by a single JSON object
    pub fn single_shot(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            stream: false,
            ..Self::streaming(model, prompt)
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options
            .get_or_insert_with(GenerationOptions::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replace the option map; an empty map is sent as "no options"
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = if options.is_empty() { None } else { Some(options) };
        self
    }

    /// Check the fields a server would reject outright
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ClientError::Config("model name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Input-method completion: instructions plus the text being converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub target: String,
    /// Overrides the client's model for this call
    #[serde(default)]
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            target: target.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Text actually sent to the model
    pub fn full_prompt(&self) -> String {
        format!("{}\n{}", self.prompt, self.target)
    }
}
