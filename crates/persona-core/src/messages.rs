use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, ToolCallId};

/// One turn of dialogue. The id is the merge key: messages arriving without
/// one get an id assigned during history merge, and are otherwise immutable
/// once merged.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "user")]
    User(UserMessage),
    #[serde(rename = "assistant")]
    Assistant(AssistantMessage),
    #[serde(rename = "tool")]
    Tool(ToolMessage),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallBlock>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub tool_call_id: ToolCallId,
    pub content: String,
}

/// A structured request from the completion service asking the caller to
/// execute a named capability before continuing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: serde_json::Value,
}

// --- Convenience constructors ---

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Message::User(UserMessage {
            id: None,
            content: text.into(),
        })
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Message::Assistant(AssistantMessage {
            id: None,
            content: text.into(),
            tool_calls: Vec::new(),
        })
    }

    pub fn tool_result(tool_call_id: ToolCallId, text: impl Into<String>) -> Self {
        Message::Tool(ToolMessage {
            id: None,
            tool_call_id,
            content: text.into(),
        })
    }

    pub fn id(&self) -> Option<&MessageId> {
        match self {
            Message::User(m) => m.id.as_ref(),
            Message::Assistant(m) => m.id.as_ref(),
            Message::Tool(m) => m.id.as_ref(),
        }
    }

    /// Assign a fresh id if the message arrived without one. Returns the id.
    pub fn ensure_id(&mut self) -> &MessageId {
        let slot = match self {
            Message::User(m) => &mut m.id,
            Message::Assistant(m) => &mut m.id,
            Message::Tool(m) => &mut m.id,
        };
        slot.get_or_insert_with(MessageId::new)
    }

    pub fn content(&self) -> &str {
        match self {
            Message::User(m) => &m.content,
            Message::Assistant(m) => &m.content,
            Message::Tool(m) => &m.content,
        }
    }
}

impl AssistantMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            content: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCallBlock>) -> Self {
        Self {
            id: None,
            content: text.into(),
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
