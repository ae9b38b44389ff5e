//! Connection target resolution and read-only settings
//!
//! Base URL precedence: explicit argument > stored setting > built-in
//! default. Settings are read from `~/.ollama-ime/config.toml` or an explicit
//! path; this crate never writes them.

use crate::errors::{ClientError, Result};
use crate::types::GenerationOptions;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Model used when neither the caller nor the settings name one
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Default request timeout; on streams it bounds each wait for data
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Return the first present value: argument, then stored, then default
pub fn resolve<T>(argument: Option<T>, stored: Option<T>, default: T) -> T {
    argument.or(stored).unwrap_or(default)
}

/// Validated root address of an inference server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    base_url: Url,
}

impl ConnectionTarget {
    /// Parse a base URL; only `http` and `https` are accepted
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let base_url = Url::parse(trimmed).map_err(|e| ClientError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::Parse {
                input: input.to_string(),
                reason: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            return Err(ClientError::Parse {
                input: input.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self { base_url })
    }

    /// Resolve argument > stored > default, ignoring blank strings
    pub fn resolve(argument: Option<&str>, stored: Option<&str>) -> Result<Self> {
        Self::parse(resolve(
            non_blank(argument),
            non_blank(stored),
            DEFAULT_BASE_URL,
        ))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL as path segments
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        if path.trim_matches('/').is_empty() {
            return Ok(url);
        }

        url.path_segments_mut()
            .map_err(|_| ClientError::Parse {
                input: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for ConnectionTarget {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }
}

/// Settings file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ollama: OllamaSettings,
    /// Sampling options sent with every request
    #[serde(default)]
    pub options: GenerationOptions,
}

/// `[ollama]` table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaSettings {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Load from an explicit path, or the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Settings::default()),
            },
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)
            .map_err(|e| ClientError::Config(format!("Failed to parse settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// `~/.ollama-ime/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollama-ime").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.ollama.base_url {
            ConnectionTarget::parse(base_url)?;
        }
        if matches!(&self.ollama.model, Some(m) if m.trim().is_empty()) {
            return Err(ClientError::Config("model must not be empty".to_string()));
        }
        if self.ollama.timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some((name, value)) = self.options.iter().find(|(_, v)| !v.is_encodable()) {
            return Err(ClientError::Encoding {
                option: name.clone(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}
