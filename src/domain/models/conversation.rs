use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatMessage, CompletionResult, StreamMetadata, ToolChoice, ToolKind};
use crate::domain::{ParameterPolicy, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Key under which the client's preferences blob is stored.
pub const STORAGE_KEY: &str = "colorburst_state";

/// The part of the client state that survives a restart.
///
/// The conversation log is not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub web_search: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            web_search: false,
        }
    }
}

impl Preferences {
    /// Lenient load: each field is adopted only when present with the right
    /// JSON type, so a partial or corrupted blob still yields usable defaults.
    pub fn from_json(raw: &str) -> Self {
        let mut prefs = Self::default();
        let Ok(Value::Object(saved)) = serde_json::from_str::<Value>(raw) else {
            return prefs;
        };

        if let Some(prompt) = saved.get("prompt").and_then(Value::as_str) {
            prefs.prompt = prompt.to_string();
        }
        if let Some(model) = saved.get("model").and_then(Value::as_str) {
            prefs.model = model.to_string();
        }
        if let Some(temperature) = saved.get("temperature").and_then(Value::as_f64) {
            prefs.temperature = temperature;
        }
        if let Some(web_search) = saved.get("webSearch").and_then(Value::as_bool) {
            prefs.web_search = web_search;
        }
        prefs
    }
}

/// Body sent to the single-shot endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub model: String,
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
}

/// Body sent to the streaming endpoint: the single-shot body plus tool fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    #[serde(flatten)]
    pub base: CompletionPayload,
    pub tools: Vec<ToolKind>,
    pub tool_choice: ToolChoice,
}

impl StreamPayload {
    pub fn without_tools(&self) -> CompletionPayload {
        self.base.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    FallbackSending,
}

/// Human-readable line shown after a submission that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusLine {
    #[default]
    Clear,
    Error(String),
    Cancelled,
}

impl StatusLine {
    pub fn message(&self) -> Option<&str> {
        match self {
            StatusLine::Clear => None,
            StatusLine::Error(message) => Some(message),
            StatusLine::Cancelled => Some("Request cancelled"),
        }
    }
}

/// What the last submission produced, for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionView {
    pub phase: SubmissionPhase,
    pub result: String,
    pub server_model: Option<String>,
    pub server_temperature: Option<f64>,
    pub server_tools: Vec<ToolKind>,
    pub usage: Option<Value>,
    pub status: StatusLine,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationAction {
    SetPrompt(String),
    SelectModel(String),
    SetTemperature(f64),
    SetWebSearch(bool),
    BeginSubmission,
    BeginStreaming(StreamMetadata),
    AppendChunk(String),
    BeginFallback,
    FallbackResult(CompletionResult),
    AppendExchange { user: String, assistant: String },
    Fail(String),
    Cancel,
    Finish,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub web_search: bool,
    pub messages: Vec<ChatMessage>,
    pub view: SubmissionView,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::from_preferences(Preferences::default())
    }
}

impl ConversationState {
    pub fn from_preferences(prefs: Preferences) -> Self {
        Self {
            prompt: prefs.prompt,
            model: prefs.model,
            temperature: prefs.temperature,
            web_search: prefs.web_search,
            messages: Vec::new(),
            view: SubmissionView::default(),
        }
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            prompt: self.prompt.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            web_search: self.web_search,
        }
    }

    /// Temperature that will actually be applied for the selected model.
    pub fn effective_temperature(&self) -> f64 {
        ParameterPolicy::apply(&self.model, self.temperature)
    }

    pub fn temperature_locked(&self) -> bool {
        ParameterPolicy::locks_temperature(&self.model)
    }

    pub fn is_busy(&self) -> bool {
        self.view.phase != SubmissionPhase::Idle
    }

    /// Build the streaming request for the current prompt, or `None` when the
    /// prompt is blank.
    pub fn build_payload(&self) -> Option<StreamPayload> {
        if self.prompt.trim().is_empty() {
            return None;
        }

        let (prompt, messages) = if self.messages.is_empty() {
            (Some(self.prompt.clone()), None)
        } else {
            let mut messages = self.messages.clone();
            messages.push(ChatMessage::user(self.prompt.clone()));
            (None, Some(messages))
        };

        let (tools, tool_choice) = if self.web_search {
            (vec![ToolKind::WebSearch], ToolChoice::Auto)
        } else {
            (Vec::new(), ToolChoice::None)
        };

        Some(StreamPayload {
            base: CompletionPayload {
                model: self.model.clone(),
                temperature: self.effective_temperature(),
                prompt,
                messages,
            },
            tools,
            tool_choice,
        })
    }

    /// Apply one action. Returns `true` when the persisted preferences changed.
    pub fn apply(&mut self, action: ConversationAction) -> bool {
        let before = self.preferences();

        match action {
            ConversationAction::SetPrompt(prompt) => self.prompt = prompt,
            ConversationAction::SelectModel(model) => {
                if ParameterPolicy::locks_temperature(&model) {
                    self.temperature = ParameterPolicy::apply(&model, self.temperature);
                }
                self.model = model;
            }
            ConversationAction::SetTemperature(temperature) => {
                if !self.temperature_locked() {
                    self.temperature = ParameterPolicy::clamp_temperature(temperature);
                }
            }
            ConversationAction::SetWebSearch(enabled) => self.web_search = enabled,
            ConversationAction::BeginSubmission => {
                self.view.phase = SubmissionPhase::Sending;
                self.view.result.clear();
                self.view.usage = None;
                self.view.status = StatusLine::Clear;
            }
            ConversationAction::BeginStreaming(metadata) => {
                self.view.phase = SubmissionPhase::Streaming;
                self.view.server_model = Some(metadata.model);
                self.view.server_temperature = Some(metadata.temperature);
                self.view.server_tools = metadata.tools;
            }
            ConversationAction::AppendChunk(chunk) => self.view.result.push_str(&chunk),
            ConversationAction::BeginFallback => self.view.phase = SubmissionPhase::FallbackSending,
            ConversationAction::FallbackResult(result) => {
                self.view.result = result.text;
                if !result.model.is_empty() {
                    self.view.server_model = Some(result.model);
                }
                self.view.server_temperature = Some(result.temperature);
                self.view.server_tools.clear();
                self.view.usage = result.usage;
            }
            ConversationAction::AppendExchange { user, assistant } => {
                self.messages.push(ChatMessage::user(user));
                self.messages.push(ChatMessage::assistant(assistant));
            }
            ConversationAction::Fail(message) => {
                self.view.phase = SubmissionPhase::Idle;
                self.view.status = StatusLine::Error(message);
            }
            ConversationAction::Cancel => {
                self.view.phase = SubmissionPhase::Idle;
                self.view.status = StatusLine::Cancelled;
            }
            ConversationAction::Finish => self.view.phase = SubmissionPhase::Idle,
            ConversationAction::Reset => {
                let phase = self.view.phase;
                self.prompt.clear();
                self.messages.clear();
                self.view = SubmissionView {
                    phase,
                    ..SubmissionView::default()
                };
            }
        }

        self.preferences() != before
    }
}
