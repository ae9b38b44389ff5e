//! Wire codec for the generate and tags endpoints
//!
//! Encoding is strict: every option must have a JSON representation.
//! Decoding of fragments is strict about `done` but ignores unknown fields;
//! decoding of model lists is best effort.

use crate::errors::{ClientError, Result};
use crate::types::{GenerateRequest, GenerationFragment, ModelList};
use serde_json::Value;

/// Serialize a request body
pub fn encode_request(request: &GenerateRequest) -> Result<Vec<u8>> {
    if let Some(options) = &request.options {
        if let Some((name, value)) = options.iter().find(|(_, v)| !v.is_encodable()) {
            return Err(ClientError::Encoding {
                option: name.clone(),
                value: value.to_string(),
            });
        }
    }

    serde_json::to_vec(request).map_err(|e| ClientError::Encoding {
        option: String::new(),
        value: e.to_string(),
    })
}

/// Parse a request body previously produced by [`encode_request`]
pub fn decode_request(bytes: &[u8]) -> Result<GenerateRequest> {
    serde_json::from_slice(bytes).map_err(|e| ClientError::decode(e.to_string(), bytes))
}

/// Parse one line of a generate response
pub fn decode_fragment(line: &[u8]) -> Result<GenerationFragment> {
    serde_json::from_slice(line).map_err(|e| ClientError::decode(e.to_string(), line))
}

/// Extract `models[*].name`, skipping entries without a string name
pub fn decode_model_list(bytes: &[u8]) -> ModelList {
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        return ModelList::new();
    };

    value
        .get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
