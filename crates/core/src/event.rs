//! Lifecycle events emitted by an agent run.
//!
//! The transport layer forwards these in emission order. Each event has a
//! wire name ([`AgentEvent::event_type`]) and a JSON payload
//! ([`AgentEvent::payload`]).

use crate::records::SearchResult;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Incremental assistant text.
    TextDelta { content: String },

    /// A tool invocation begins.
    ToolStart {
        id: String,
        name: String,
        arguments: Value,
    },

    /// The tool succeeded.
    ToolResult { id: String, name: String, result: Value },

    /// The tool failed. The run continues.
    ToolError { id: String, name: String, error: String },

    /// The run finished; `content` is the full accumulated text.
    Done { content: String },

    /// Onboarding interview finished. Always directly precedes `Done`.
    OnboardingComplete {},

    /// The run failed. Nothing follows.
    Error { message: String },

    SearchStarted { query: String },

    SearchProgress { content: String },

    SearchResultAdded(SearchResult),

    SearchCompleted { results_added: usize },
}

impl AgentEvent {
    /// The SSE event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::ToolError { .. } => "tool_error",
            Self::Done { .. } => "done",
            Self::OnboardingComplete {} => "onboarding_complete",
            Self::Error { .. } => "error",
            Self::SearchStarted { .. } => "search_started",
            Self::SearchProgress { .. } => "search_progress",
            Self::SearchResultAdded(_) => "search_result_added",
            Self::SearchCompleted { .. } => "search_completed",
        }
    }

    /// The SSE data payload.
    pub fn payload(&self) -> Value {
        match self {
            Self::TextDelta { content } | Self::Done { content } | Self::SearchProgress { content } => {
                json!({ "content": content })
            }
            Self::ToolStart { id, name, arguments } => {
                json!({ "id": id, "name": name, "arguments": arguments })
            }
            Self::ToolResult { id, name, result } => {
                json!({ "id": id, "name": name, "result": result })
            }
            Self::ToolError { id, name, error } => {
                json!({ "id": id, "name": name, "error": error })
            }
            Self::OnboardingComplete {} => json!({}),
            Self::Error { message } => json!({ "message": message }),
            Self::SearchStarted { query } => json!({ "query": query }),
            Self::SearchResultAdded(result) => serde_json::to_value(result).unwrap_or(Value::Null),
            Self::SearchCompleted { results_added } => json!({ "results_added": results_added }),
        }
    }

    /// True for `done` and `error`, after which a run emits nothing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// The tool call id this event refers to, for tool lifecycle events.
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolStart { id, .. } | Self::ToolResult { id, .. } | Self::ToolError { id, .. } => {
                Some(id)
            }
            _ => None,
        }
    }
}
