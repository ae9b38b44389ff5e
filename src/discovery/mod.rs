//! Server discovery for the Ollama API
//!
//! Liveness probe on the base URL and model enumeration via `/api/tags`.

use crate::config::ConnectionTarget;
use crate::errors::Result;
use crate::streaming::codec::decode_model_list;
use crate::streaming::transport::TransportSession;
use crate::types::ModelList;
use tracing::debug;

/// Model listing endpoint path
pub const TAGS_PATH: &str = "api/tags";

/// Result of a combined readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Ready,
    NotRunning,
    ModelMissing(String),
}

/// GET the base URL; `Ok(true)` only for HTTP 200
///
/// Any other status is returned as [`ClientError::UnexpectedStatus`](crate::ClientError::UnexpectedStatus) and a
/// network failure as [`ClientError::Connection`](crate::ClientError::Connection).
pub async fn check_connection(
    transport: &TransportSession,
    target: &ConnectionTarget,
) -> Result<bool> {
    transport.get_once(target, "").await?;
    Ok(true)
}

/// GET `/api/tags` and extract model names
///
/// A body of unexpected shape yields an empty list.
pub async fn list_models(
    transport: &TransportSession,
    target: &ConnectionTarget,
) -> Result<ModelList> {
    let body = transport.get_once(target, TAGS_PATH).await?;
    let models = decode_model_list(&body);
    debug!(count = models.len(), "listed models");
    Ok(models)
}

/// Check if a specific model is installed
pub async fn check_model_available(
    transport: &TransportSession,
    target: &ConnectionTarget,
    model: &str,
) -> Result<bool> {
    let models = list_models(transport, target).await?;
    Ok(models.iter().any(|m| m == model))
}

/// Run liveness then model checks, folding connection failures into status
pub async fn probe(
    transport: &TransportSession,
    target: &ConnectionTarget,
    model: &str,
) -> Result<ServerStatus> {
    match check_connection(transport, target).await {
        Ok(_) => {}
        Err(e) if e.is_connection_error() => {
            debug!(error = %e, "server not reachable");
            return Ok(ServerStatus::NotRunning);
        }
        Err(e) => return Err(e),
    }

    if !check_model_available(transport, target, model).await? {
        return Ok(ServerStatus::ModelMissing(model.to_string()));
    }

    Ok(ServerStatus::Ready)
}

/// Human-readable hint for a non-ready status
pub fn status_hint(status: &ServerStatus) -> Option<String> {
    match status {
        ServerStatus::Ready => None,
        ServerStatus::NotRunning => {
            Some("Ollama is not running. Start it with: ollama serve".to_string())
        }
        ServerStatus::ModelMissing(model) => Some(format!(
            "Model '{}' not found. Download it with: ollama pull {}",
            model, model
        )),
    }
}
