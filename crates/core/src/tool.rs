//! Tool trait and the registry that dispatches to tools.
//!
//! The registry is an explicit ordered list built at startup. Definitions come
//! out in registration order, and `execute` never fails: unknown names, bad
//! arguments and tool failures all come back as `{"error": "..."}` so one bad
//! call cannot end a conversation.

use crate::error::ToolError;
use crate::event::AgentEvent;
use crate::message::ConversationId;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A fully parsed tool invocation, ready to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Per-run context handed to every tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The conversation the run belongs to, when there is one.
    pub conversation_id: Option<ConversationId>,
    /// Sink for extra events a tool wants to surface (sub-agent progress).
    pub events: Option<mpsc::Sender<AgentEvent>>,
    /// Cancelled when the caller stops the run.
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn for_conversation(id: ConversationId) -> Self {
        Self {
            conversation_id: Some(id),
            ..Self::default()
        }
    }

    /// Forwards an event to the run's sink. A closed sink is ignored.
    pub async fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// A named, schema-described capability the model may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, e.g. "create_job".
    fn name(&self) -> &str;

    /// What the tool does, written for the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Runs the tool. The returned value is serialized into the tool message.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Ordered catalog of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registers a tool. A tool with the same name is replaced in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(pos) => self.tools[pos] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// A registry holding only the named tools, in this registry's order.
    pub fn subset(&self, names: &[&str]) -> Self {
        Self {
            tools: self
                .tools
                .iter()
                .filter(|t| names.contains(&t.name()))
                .cloned()
                .collect(),
        }
    }

    /// Dispatches one call. Always returns a JSON object; failures are shaped
    /// as `{"error": message}`.
    pub async fn execute(&self, name: &str, arguments: Value, ctx: &ToolContext) -> Value {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "Model requested an unregistered tool");
            return error_result(&ToolError::NotFound(name.to_string()));
        };

        if let Err(e) = check_arguments(&tool.parameters_schema(), &arguments) {
            return error_result(&e);
        }

        match tool.execute(arguments, ctx).await {
            Ok(value) if value.is_object() => value,
            Ok(value) => json!({ "result": value }),
            Err(e) => {
                debug!(tool = name, error = %e, "Tool execution failed");
                error_result(&e)
            }
        }
    }
}

/// Shapes a tool failure the way the model and the event stream expect it.
pub fn error_result(err: &ToolError) -> Value {
    json!({ "error": err.to_string() })
}

/// The error message of an error-shaped result, if it is one.
pub fn result_error(result: &Value) -> Option<String> {
    let err = result.get("error")?;
    if err.is_null() {
        return None;
    }
    Some(match err.as_str() {
        Some(s) => s.to_string(),
        None => err.to_string(),
    })
}

/// Checks that `arguments` is an object carrying every `required` field.
fn check_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let Some(object) = arguments.as_object() else {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".into(),
        ));
    };
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for field in required {
        if object.get(field).is_none_or(Value::is_null) {
            return Err(ToolError::InvalidArguments(format!(
                "Missing '{field}' argument"
            )));
        }
    }
    Ok(())
}

/// Reads an optional string argument.
pub fn opt_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Reads a required string argument.
pub fn req_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    opt_str(arguments, key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Reads an integer argument, accepting numbers sent as strings.
pub fn opt_i64(arguments: &Value, key: &str) -> Option<i64> {
    match arguments.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a boolean argument, accepting "true"/"false" strings.
pub fn opt_bool(arguments: &Value, key: &str) -> Option<bool> {
    match arguments.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
