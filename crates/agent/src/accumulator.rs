//! Assembles streamed fragments into one model turn.
//!
//! Text is appended as it arrives. Tool-call pieces are merged by index: the
//! first id and name seen for an index stick, argument text is concatenated
//! in arrival order. Nothing is parsed until the stream is exhausted.

use serde_json::Value;
use shortlist_core::provider::{StreamChunk, ToolCallDelta};
use shortlist_core::tool::ToolCall;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// A tool call as it left the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizedCall {
    Ready(ToolCall),
    /// The argument text never became a JSON object.
    Malformed {
        id: String,
        name: String,
        raw_arguments: String,
        error: String,
    },
}

impl FinalizedCall {
    pub fn id(&self) -> &str {
        match self {
            Self::Ready(call) => &call.id,
            Self::Malformed { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Ready(call) => &call.name,
            Self::Malformed { name, .. } => name,
        }
    }
}

/// Everything one streamed turn produced.
#[derive(Debug, Default)]
pub struct Turn {
    pub text: String,
    /// Text runs separated by tool-call output.
    pub segments: Vec<String>,
    /// Calls in ascending index order.
    pub calls: Vec<FinalizedCall>,
}

#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    text: String,
    segments: Vec<String>,
    segment_open: bool,
    calls: BTreeMap<usize, PendingCall>,
}

/// `call_` plus a fresh uuid, for calls the backend never named.
pub fn synthesize_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk. Returns the chunk's text, if any.
    pub fn push<'a>(&mut self, chunk: &'a StreamChunk) -> Option<&'a str> {
        let text = chunk.content.as_deref().filter(|t| !t.is_empty());
        if let Some(text) = text {
            self.push_text(text);
        }
        for delta in &chunk.tool_calls {
            self.push_tool_delta(delta);
        }
        text
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
        if self.segment_open {
            if let Some(last) = self.segments.last_mut() {
                last.push_str(text);
            }
        } else {
            self.segments.push(text.to_string());
            self.segment_open = true;
        }
    }

    pub fn push_tool_delta(&mut self, delta: &ToolCallDelta) {
        self.segment_open = false;
        let call = self.calls.entry(delta.index).or_default();
        if call.id.is_none() {
            call.id = delta.id.clone().filter(|id| !id.is_empty());
        }
        if call.name.is_none() {
            call.name = delta.name.clone().filter(|n| !n.is_empty());
        }
        call.arguments.push_str(&delta.arguments);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Parses every accumulated call.
    pub fn finish(self) -> Turn {
        let calls = self
            .calls
            .into_iter()
            .filter_map(|(index, pending)| {
                let Some(name) = pending.name else {
                    warn!(index, "Dropping streamed tool call without a name");
                    return None;
                };
                let id = pending.id.unwrap_or_else(synthesize_call_id);
                Some(parse_call(id, name, pending.arguments))
            })
            .collect();

        Turn {
            text: self.text,
            segments: self.segments,
            calls,
        }
    }
}

fn parse_call(id: String, name: String, raw: String) -> FinalizedCall {
    if raw.trim().is_empty() {
        return FinalizedCall::Ready(ToolCall {
            id,
            name,
            arguments: Value::Object(Default::default()),
        });
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(arguments @ Value::Object(_)) => FinalizedCall::Ready(ToolCall { id, name, arguments }),
        Ok(other) => FinalizedCall::Malformed {
            id,
            name,
            error: format!("arguments must be a JSON object, got {other}"),
            raw_arguments: raw,
        },
        Err(e) => {
            warn!(tool = %name, error = %e, "Tool call arguments are not valid JSON");
            FinalizedCall::Malformed {
                id,
                name,
                error: format!("arguments are not valid JSON: {e}"),
                raw_arguments: raw,
            }
        }
    }
}
