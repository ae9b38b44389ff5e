//! Response payloads: streamed fragments, the aggregated result, model lists

use serde::{Deserialize, Serialize};

/// One decoded line of a generate response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFragment {
    #[serde(default)]
    pub response: Option<String>,
    pub done: bool,
}

impl GenerationFragment {
    pub fn text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}

/// Finalized outcome of consuming a generate stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedResult {
    /// Concatenated fragment text in arrival order
    pub text: String,
    /// Fragments successfully decoded
    pub fragments: usize,
    /// Lines skipped as empty, non-UTF-8 or undecodable
    pub skipped: usize,
    /// Whether a `done: true` fragment was seen
    pub completed: bool,
}

impl AggregatedResult {
    /// Non-empty lines of the generated text
    pub fn lines(&self) -> Vec<String> {
        split_lines(&self.text)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Split text on `\n`, dropping blank lines and trailing `\r`
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Model names in server order, duplicates kept
pub type ModelList = Vec<String>;
