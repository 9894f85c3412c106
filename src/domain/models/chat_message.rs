use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Strict parse: only the three known role names are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A message as received on the wire, before role filtering.
///
/// The role stays a raw string because the streaming transcript renders
/// whatever role the caller sent, while the single-shot path drops unknown ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl InboundMessage {
    pub fn new(role: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            role: role.map(String::from),
            content: content.into(),
        }
    }

    /// Typed view of this message, or `None` when the role is unknown or the
    /// content is blank.
    pub fn to_chat_message(&self) -> Option<ChatMessage> {
        let role = self.role.as_deref().and_then(Role::parse)?;
        let message = ChatMessage::new(role, self.content.clone());
        if message.is_blank() {
            return None;
        }
        Some(message)
    }

    /// Role used when rendering a transcript line; missing or empty means user.
    pub fn transcript_role(&self) -> &str {
        match self.role.as_deref() {
            Some(role) if !role.is_empty() => role,
            _ => Role::User.as_str(),
        }
    }
}

impl From<ChatMessage> for InboundMessage {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: Some(message.role.as_str().to_string()),
            content: message.content,
        }
    }
}
