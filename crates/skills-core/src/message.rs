//! Conversation Messages
//!
//! Transcript format shared by the orchestrator and the providers. Content
//! is either plain text or a list of typed blocks, matching the tool-use
//! wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input and tool results
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One typed block of message content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Message content: plain text or typed blocks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text or blocks
    pub content: Content,
}

impl Message {
    /// Create a user text message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(content.into()),
        }
    }

    /// Create an assistant text message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
        }
    }

    /// Create a message from content blocks
    pub const fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: Content::Blocks(blocks),
        }
    }

    /// Concatenated text of the message
    pub fn text(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks.iter().filter_map(ContentBlock::as_text).collect(),
        }
    }

    /// Tool-use blocks, in order
    pub fn tool_uses(&self) -> impl Iterator<Item = &ContentBlock> {
        let blocks = match &self.content {
            Content::Text(_) => &[][..],
            Content::Blocks(blocks) => blocks.as_slice(),
        };
        blocks
            .iter()
            .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

/// Append-only transcript of one conversation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation from the user's query
    pub fn from_user(query: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::user(query));
        conv
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello");
    }

    #[test]
    fn test_wire_format() {
        let msg = Message::blocks(
            Role::Assistant,
            vec![
                ContentBlock::text("Let me check."),
                ContentBlock::tool_use("toolu_1", "weather_checker", json!({"location": "Oslo"})),
            ],
        );

        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": [
                    {"type": "text", "text": "Let me check."},
                    {"type": "tool_use", "id": "toolu_1", "name": "weather_checker", "input": {"location": "Oslo"}}
                ]
            })
        );
        assert_eq!(
            serde_json::to_value(Message::user("hi")).unwrap(),
            json!({"role": "user", "content": "hi"})
        );
    }

    #[test]
    fn test_text_skips_tool_blocks() {
        let msg = Message::blocks(
            Role::Assistant,
            vec![
                ContentBlock::tool_use("1", "a", json!({})),
                ContentBlock::text("done"),
            ],
        );
        assert_eq!(msg.text(), "done");
        assert_eq!(msg.tool_uses().count(), 1);
    }

    #[test]
    fn test_conversation() {
        let mut conv = Conversation::from_user("Hi");
        conv.push(Message::assistant("Hello!"));

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last().unwrap().role, Role::Assistant);
    }
}
