use serde_json::Value;

use crate::domain::{
    CompletionRequest, ConversationInput, DomainError, InboundMessage, ParameterPolicy, ToolChoice,
    ToolKind,
};

pub const MISSING_INPUT: &str = "Missing prompt or messages";

/// Turns a loosely typed request body into a [`CompletionRequest`].
pub struct RequestValidator;

impl RequestValidator {
    /// Parse raw body bytes. Anything that is not a JSON object behaves like
    /// an empty body and is rejected by [`Self::validate`].
    pub fn parse_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }

    pub fn validate(body: &Value) -> Result<CompletionRequest, DomainError> {
        let input = Self::conversation_input(body)
            .ok_or_else(|| DomainError::invalid_input(MISSING_INPUT))?;

        let (model, temperature) =
            ParameterPolicy::resolve(body.get("model"), body.get("temperature"));

        Ok(CompletionRequest {
            model,
            temperature,
            input,
            tools: ToolKind::filter_requested(body.get("tools")),
            tool_choice: ToolChoice::from_value(body.get("tool_choice")),
        })
    }

    pub fn validate_bytes(bytes: &[u8]) -> Result<CompletionRequest, DomainError> {
        Self::validate(&Self::parse_body(bytes))
    }

    /// A non-empty `messages` array wins over `prompt`; a prompt counts only
    /// when it is a non-empty string.
    fn conversation_input(body: &Value) -> Option<ConversationInput> {
        if let Some(Value::Array(entries)) = body.get("messages") {
            if !entries.is_empty() {
                return Some(ConversationInput::Messages(
                    entries.iter().map(Self::inbound_message).collect(),
                ));
            }
        }

        match body.get("prompt") {
            Some(Value::String(prompt)) if !prompt.is_empty() => {
                Some(ConversationInput::Prompt(prompt.clone()))
            }
            _ => None,
        }
    }

    fn inbound_message(entry: &Value) -> InboundMessage {
        let role = entry.get("role").and_then(Value::as_str).map(String::from);
        let content = match entry.get("content") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        InboundMessage { role, content }
    }
}
