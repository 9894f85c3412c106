use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upstream-side tools a streaming request may enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    CodeInterpreter,
    FileSearch,
    WebSearch,
}

impl ToolKind {
    pub const ALLOWED: [ToolKind; 3] = [
        ToolKind::CodeInterpreter,
        ToolKind::FileSearch,
        ToolKind::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::CodeInterpreter => "code_interpreter",
            ToolKind::FileSearch => "file_search",
            ToolKind::WebSearch => "web_search",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALLOWED.into_iter().find(|tool| tool.as_str() == s)
    }

    /// Keep only allow-listed tool names from a loosely typed `tools` field.
    ///
    /// Anything that is not an array yields no tools; non-string and unknown
    /// entries are dropped silently. Order is preserved, duplicates removed.
    pub fn filter_requested(value: Option<&Value>) -> Vec<ToolKind> {
        let Some(Value::Array(entries)) = value else {
            return Vec::new();
        };

        let mut tools = Vec::new();
        for tool in entries.iter().filter_map(Value::as_str).filter_map(Self::parse) {
            if !tools.contains(&tool) {
                tools.push(tool);
            }
        }
        tools
    }

    pub fn join(tools: &[ToolKind]) -> String {
        tools
            .iter()
            .map(ToolKind::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
            ToolChoice::Required => "required",
        }
    }

    /// Unknown or non-string values fall back to `auto`.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("none") => ToolChoice::None,
            Some("required") => ToolChoice::Required,
            _ => ToolChoice::Auto,
        }
    }
}
