use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChatMessage, InboundMessage, ToolChoice, ToolKind};

/// Fixed system turn prepended to every single-shot completion.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// What the caller asked about: either a bare prompt or a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationInput {
    Prompt(String),
    Messages(Vec<InboundMessage>),
}

impl ConversationInput {
    /// Upstream message list for the single-shot path.
    ///
    /// Conversations are filtered (unknown roles and blank turns dropped, order
    /// kept); a bare prompt is passed through verbatim.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        match self {
            ConversationInput::Prompt(prompt) => messages.push(ChatMessage::user(prompt.clone())),
            ConversationInput::Messages(inbound) => {
                messages.extend(inbound.iter().filter_map(InboundMessage::to_chat_message))
            }
        }
        messages
    }

    /// Flattened text used as streaming input: one `role: content` line per turn.
    pub fn to_transcript(&self) -> String {
        match self {
            ConversationInput::Prompt(prompt) => prompt.clone(),
            ConversationInput::Messages(inbound) => inbound
                .iter()
                .map(|m| format!("{}: {}", m.transcript_role(), m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A validated request with parameters already normalized by the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f64,
    pub input: ConversationInput,
    pub tools: Vec<ToolKind>,
    pub tool_choice: ToolChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    /// Upstream usage record, passed through verbatim.
    #[serde(default)]
    pub usage: Option<Value>,
}

impl CompletionResult {
    pub fn total_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(usage_total_tokens)
    }
}

/// Total token count of a usage record, accepting either `total_tokens` or
/// `total`.
pub fn usage_total_tokens(usage: &Value) -> Option<u64> {
    usage
        .get("total_tokens")
        .or_else(|| usage.get("total"))
        .and_then(Value::as_u64)
}

/// Single-shot upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionCall {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// What the upstream returned for a single-shot call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamCompletion {
    pub text: Option<String>,
    pub usage: Option<Value>,
}

/// Streaming upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingCall {
    pub model: String,
    pub input: String,
    pub temperature: f64,
    pub tools: Vec<ToolKind>,
    pub tool_choice: ToolChoice,
}
