use serde::{Deserialize, Serialize};

use super::ToolKind;

pub const MODEL_HEADER: &str = "x-model";
pub const TEMPERATURE_HEADER: &str = "x-temperature";
pub const TOOLS_HEADER: &str = "x-tools";

/// One event read from an upstream streaming session, reduced to what the
/// relay acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    TextDelta(String),
    Error(String),
    Completed,
    Other,
}

/// Effective parameters of a streamed completion, known before the first byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub model: String,
    pub temperature: f64,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
}

impl StreamMetadata {
    pub fn new(model: impl Into<String>, temperature: f64, tools: Vec<ToolKind>) -> Self {
        Self {
            model: model.into(),
            temperature,
            tools,
        }
    }

    /// Temperature rendered the way the `X-Temperature` header carries it
    /// (`1`, `0.7`).
    pub fn temperature_header(&self) -> String {
        format!("{}", self.temperature)
    }

    /// Rebuild metadata from response headers, falling back to what was
    /// requested for any header that is missing or unparsable.
    pub fn from_headers(
        model: Option<&str>,
        temperature: Option<&str>,
        tools: Option<&str>,
        requested: &StreamMetadata,
    ) -> Self {
        Self {
            model: model
                .filter(|m| !m.is_empty())
                .map_or_else(|| requested.model.clone(), str::to_string),
            temperature: temperature
                .and_then(|t| t.trim().parse::<f64>().ok())
                .unwrap_or(requested.temperature),
            tools: tools
                .map(|list| list.split(',').filter_map(|t| ToolKind::parse(t.trim())).collect())
                .unwrap_or_default(),
        }
    }

    pub fn tools_header(&self) -> Option<String> {
        if self.tools.is_empty() {
            None
        } else {
            Some(ToolKind::join(&self.tools))
        }
    }
}
