//! Conversation turns.
//!
//! A [`Message`] is one turn in the history the agent loop sends to a model.
//! Assistant turns may carry tool calls; tool turns point back at the call
//! they answer through `tool_call_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a chat conversation. Search results and todos hang off it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "new_id")]
    pub id: String,

    pub role: Role,

    /// Text content, possibly empty for assistant turns that only call tools.
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the assistant, in the order the model emitted them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// For tool turns: the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
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

    /// An assistant turn that requested tools.
    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// A tool turn carrying the serialized result for `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// A tool call as recorded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,
    pub name: String,
    /// Arguments as JSON text.
    pub arguments: String,
}

/// A conversation transcript kept by the transport layer between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }
}

/// Checks that every tool turn answers a call made by an earlier assistant
/// turn. Providers reject histories that break this pairing.
pub fn tool_pairing_is_valid(messages: &[Message]) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for message in messages {
        match message.role {
            Role::Assistant => open.extend(message.tool_calls.iter().map(|c| c.id.as_str())),
            Role::Tool => {
                let Some(id) = message.tool_call_id.as_deref() else {
                    return false;
                };
                match open.iter().position(|open_id| *open_id == id) {
                    Some(pos) => {
                        open.remove(pos);
                    }
                    None => return false,
                }
            }
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> MessageToolCall {
        MessageToolCall {
            id: id.into(),
            name: "list_jobs".into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn tool_result_points_back_at_call() {
        let msg = Message::tool_result("call_1", r#"{"jobs":[]}"#);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn history_deserializes_with_minimal_fields() {
        let raw = r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#;
        let history: Vec<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert!(!history[0].id.is_empty());
    }

    #[test]
    fn pairing_accepts_answered_calls() {
        let history = vec![
            Message::user("find jobs"),
            Message::assistant_with_tools("", vec![call("a"), call("b")]),
            Message::tool_result("a", "{}"),
            Message::tool_result("b", "{}"),
        ];
        assert!(tool_pairing_is_valid(&history));
    }

    #[test]
    fn pairing_rejects_orphan_tool_turn() {
        let history = vec![Message::user("hi"), Message::tool_result("ghost", "{}")];
        assert!(!tool_pairing_is_valid(&history));
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new(ConversationId::from("c1"));
        let created = conv.created_at;
        conv.push(Message::user("First message"));
        assert_eq!(conv.messages.len(), 1);
        assert!(conv.updated_at >= created);
    }
}
