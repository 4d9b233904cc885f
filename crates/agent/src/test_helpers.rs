//! Shared fixtures for agent tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_config::SearchConfig;
use shortlist_core::error::{ProviderError, StoreError, ToolError};
use shortlist_core::event::AgentEvent;
use shortlist_core::message::Message;
use shortlist_core::provider::{
    ChunkStream, Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallDelta,
};
use shortlist_core::store::ProfileStore;
use shortlist_core::tool::{Tool, ToolContext};
use shortlist_store::{
    FileResumeStore, InMemoryJobStore, InMemorySearchResultStore, InMemoryTodoStore,
};
use shortlist_tools::ToolDeps;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};

pub type ScriptedTurn = Vec<Result<StreamChunk, ProviderError>>;

/// A provider that streams one scripted turn per request.
///
/// Requests are recorded so tests can inspect what the model was shown.
/// Once the script runs out every request fails.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    gate: Option<Gate>,
    /// Reply for single-shot calls.
    reply: Option<String>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Arc::default(),
            gate: None,
            reply: None,
        }
    }

    /// A provider whose `complete` answers with `text`.
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Chunks are only sent as the gate releases them.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate(Arc::new(Semaphore::new(0))));
        self
    }

    pub fn gate(&self) -> Gate {
        self.gate.clone().expect("provider is not gated")
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<ProviderRequest>>> {
        self.requests.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Some(text) => Ok(ProviderResponse {
                message: Message::assistant(text.clone()),
                usage: None,
                model: request.model,
            }),
            None => Err(ProviderError::NotConfigured("no scripted reply".into())),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::NotConfigured("script exhausted".into()))?;

        let (tx, rx) = mpsc::channel(16);
        let gate = self.gate.clone();
        tokio::spawn(async move {
            for chunk in turn {
                if let Some(gate) = &gate {
                    match gate.0.acquire().await {
                        Ok(permit) => permit.forget(),
                        Err(_) => return,
                    }
                }
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// Releases chunks of a gated [`ScriptedProvider`].
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn release(&self, chunks: usize) {
        self.0.add_permits(chunks);
    }
}

/// A turn streaming `pieces` as text.
pub fn text_turn(pieces: &[&str]) -> ScriptedTurn {
    pieces.iter().map(|p| Ok(StreamChunk::text(*p))).collect()
}

/// A turn with optional text followed by whole tool calls.
pub fn tool_turn(text: &str, calls: &[(&str, &str, Value)]) -> ScriptedTurn {
    let mut turn = Vec::new();
    if !text.is_empty() {
        turn.push(Ok(StreamChunk::text(text)));
    }
    for (index, (id, name, arguments)) in calls.iter().enumerate() {
        turn.push(Ok(StreamChunk::tool(ToolCallDelta {
            index,
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            arguments: arguments.to_string(),
        })));
    }
    turn
}

/// Concatenation of every `text_delta` in `events`.
pub fn deltas_text(events: &[AgentEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::TextDelta { content } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Records the `label` argument of every call, in call order.
pub struct RecordingTool {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingTool {
    pub fn new(name: &str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name: name.to_string(),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records its label"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "label": { "type": "string" } },
            "required": ["label"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let label = arguments["label"].as_str().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(label.clone());
        Ok(json!({ "recorded": label }))
    }
}

/// Always returns the same result.
pub struct StubTool {
    name: String,
    result: Value,
}

impl StubTool {
    pub fn new(name: &str, result: Value) -> Self {
        Self {
            name: name.to_string(),
            result,
        }
    }
}

#[async_trait]
impl Tool for StubTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed result"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(self.result.clone())
    }
}

/// Reports the conversation id from its context.
pub struct ConversationEchoTool;

#[async_trait]
impl Tool for ConversationEchoTool {
    fn name(&self) -> &str {
        "whoami"
    }

    fn description(&self) -> &str {
        "Returns the current conversation id"
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(json!({
            "conversation_id": ctx.conversation_id.as_ref().map(ToString::to_string)
        }))
    }
}

/// An in-memory profile that counts how often the onboarded flag is set.
#[derive(Default)]
pub struct RecordingProfile {
    content: Mutex<String>,
    onboarded: Mutex<bool>,
    pub set_onboarded_calls: AtomicUsize,
    pub reads: AtomicUsize,
}

impl RecordingProfile {
    pub fn with_content(content: &str) -> Self {
        Self {
            content: Mutex::new(content.to_string()),
            ..Self::default()
        }
    }

    pub fn set_onboarded_count(&self) -> usize {
        self.set_onboarded_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for RecordingProfile {
    async fn read(&self) -> Result<String, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.content.lock().unwrap().clone())
    }

    async fn write(&self, content: &str) -> Result<(), StoreError> {
        *self.content.lock().unwrap() = content.to_string();
        Ok(())
    }

    async fn is_onboarded(&self) -> Result<bool, StoreError> {
        Ok(*self.onboarded.lock().unwrap())
    }

    async fn set_onboarded(&self, onboarded: bool) -> Result<(), StoreError> {
        self.set_onboarded_calls.fetch_add(1, Ordering::SeqCst);
        *self.onboarded.lock().unwrap() = onboarded;
        Ok(())
    }
}

/// Tool dependencies backed by in-memory stores, `profile`, and a resume
/// store under `dir`.
pub fn test_deps(
    provider: Arc<dyn Provider>,
    profile: Arc<dyn ProfileStore>,
    dir: &std::path::Path,
) -> ToolDeps {
    ToolDeps {
        jobs: Arc::new(InMemoryJobStore::new()),
        search_results: Arc::new(InMemorySearchResultStore::new()),
        todos: Arc::new(InMemoryTodoStore::new()),
        profile,
        resume: Arc::new(FileResumeStore::new(dir)),
        search: SearchConfig::default(),
        provider,
        model: "test-model".into(),
    }
}
