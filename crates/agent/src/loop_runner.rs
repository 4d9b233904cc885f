//! The agent loop: stream a turn, run the tools it asked for, feed the
//! results back, repeat.
//!
//! A run is a spawned task that owns its message history and pushes
//! [`AgentEvent`]s into a channel. The caller holds an [`AgentRun`] and pulls
//! events from it. Every suspension point (fragment pull, tool execution,
//! event send) also watches the run's cancellation token, so a cancelled run
//! stops where it is and emits nothing further.

use crate::accumulator::{FinalizedCall, FragmentAccumulator, Turn};
use async_trait::async_trait;
use serde_json::json;
use shortlist_core::error::ProviderError;
use shortlist_core::event::AgentEvent;
use shortlist_core::message::{ConversationId, Message, MessageToolCall, Role};
use shortlist_core::provider::{Provider, ProviderRequest};
use shortlist_core::tool::{ToolContext, ToolRegistry, result_error};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Message of the terminal error when the iteration cap is hit.
pub const MAX_ITERATIONS_MESSAGE: &str = "max iterations reached";

/// Inserted before a later turn's first text when earlier text exists.
pub const TURN_SEPARATOR: &str = "\n\n";

const DEFAULT_MAX_ITERATIONS: u32 = 15;
const EVENT_BUFFER: usize = 64;

/// The per-variant parts of a run.
#[async_trait]
pub trait TurnPolicy: Send + Sync {
    /// System prompt for the next model turn. Called before every turn.
    async fn system_prompt(&self) -> String;

    /// Literal sentinel that ends the run when the model writes it. It is
    /// never shown in emitted text.
    fn completion_marker(&self) -> Option<&str> {
        None
    }

    /// Runs once when the completion marker was seen, before
    /// `onboarding_complete` is emitted.
    async fn on_marker(&self) {}
}

/// A system prompt computed once up front.
pub struct FixedPrompt(pub String);

#[async_trait]
impl TurnPolicy for FixedPrompt {
    async fn system_prompt(&self) -> String {
        self.0.clone()
    }
}

/// Orchestrates model turns and tool execution.
#[derive(Clone)]
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: ToolRegistry,
    policy: Arc<dyn TurnPolicy>,
    max_iterations: u32,
    conversation_id: Option<ConversationId>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: ToolRegistry,
        policy: Arc<dyn TurnPolicy>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            policy,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            conversation_id: None,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Conversation handed to tools through their context.
    pub fn with_conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Starts a run over `history`. System messages in `history` are
    /// ignored; the policy supplies the system prompt.
    pub fn run(&self, history: Vec<Message>) -> AgentRun {
        self.run_with_cancel(history, CancellationToken::new())
    }

    /// Like [`run`](Self::run), stopping when `cancel` fires.
    pub fn run_with_cancel(&self, history: Vec<Message>, cancel: CancellationToken) -> AgentRun {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let history = history.into_iter().filter(|m| m.role != Role::System).collect();
        let state = RunState {
            agent: self.clone(),
            history,
            emitter: Emitter {
                tx,
                cancel: cancel.clone(),
            },
            full_text: String::new(),
        };
        tokio::spawn(state.drive());

        AgentRun {
            events: rx,
            cancel,
            partial: String::new(),
        }
    }
}

/// Handle to a running loop.
///
/// Dropping the handle cancels the run.
pub struct AgentRun {
    events: mpsc::Receiver<AgentEvent>,
    cancel: CancellationToken,
    partial: String,
}

impl AgentRun {
    /// The next event, or `None` once the run has ended or was cancelled.
    pub async fn recv(&mut self) -> Option<AgentEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let event = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }?;
        if let AgentEvent::TextDelta { content } = &event {
            self.partial.push_str(content);
        }
        Some(event)
    }

    /// Stops the run. Text already delivered stays in
    /// [`partial_text`](Self::partial_text).
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.events.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Concatenation of every `text_delta` handed out by `recv`.
    pub fn partial_text(&self) -> &str {
        &self.partial
    }

    /// Drains the run to the end.
    pub async fn collect(mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }
}

impl Drop for AgentRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The run was cancelled or its receiver went away.
struct Halted;

struct Emitter {
    tx: mpsc::Sender<AgentEvent>,
    cancel: CancellationToken,
}

impl Emitter {
    async fn emit(&self, event: AgentEvent) -> Result<(), Halted> {
        if self.cancel.is_cancelled() {
            return Err(Halted);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Halted),
            sent = self.tx.send(event) => sent.map_err(|_| Halted),
        }
    }
}

/// State owned by one run.
struct RunState {
    agent: AgentLoop,
    history: Vec<Message>,
    emitter: Emitter,
    /// Everything emitted as `text_delta` so far.
    full_text: String,
}

impl RunState {
    async fn drive(mut self) {
        info!(
            conversation_id = ?self.agent.conversation_id.as_ref().map(ToString::to_string),
            messages = self.history.len(),
            tools = self.agent.tools.len(),
            "Agent run started"
        );
        if self.iterate().await.is_err() {
            debug!("Agent run cancelled");
        }
    }

    async fn iterate(&mut self) -> Result<(), Halted> {
        let definitions = self.agent.tools.definitions();
        let mut marker = self.agent.policy.completion_marker().map(MarkerFilter::new);

        for iteration in 1..=self.agent.max_iterations {
            debug!(iteration, "Agent loop iteration");

            let mut messages = Vec::with_capacity(self.history.len() + 1);
            messages.push(Message::system(self.agent.policy.system_prompt().await));
            messages.extend(self.history.iter().cloned());
            let mut request = ProviderRequest::new(self.agent.model.clone(), messages)
                .with_tools(definitions.clone())
                .with_temperature(self.agent.temperature);
            request.max_tokens = self.agent.max_tokens;
            request.stream = true;

            let turn = match self.stream_turn(request, marker.as_mut()).await? {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(iteration, error = %e, "Provider failed, ending run");
                    return self.emit(AgentEvent::Error { message: e.to_string() }).await;
                }
            };
            let marker_seen = marker.as_ref().is_some_and(|m| m.seen);

            if turn.calls.is_empty() {
                return self.finish(marker_seen).await;
            }

            self.history.push(assistant_message(&turn));
            for call in turn.calls {
                self.run_tool(call).await?;
            }

            if marker_seen {
                return self.finish(true).await;
            }
        }

        warn!(max_iterations = self.agent.max_iterations, "Iteration cap reached");
        self.emit(AgentEvent::Error {
            message: MAX_ITERATIONS_MESSAGE.into(),
        })
        .await
    }

    /// Streams one turn, emitting text as it arrives.
    async fn stream_turn(
        &mut self,
        request: ProviderRequest,
        mut marker: Option<&mut MarkerFilter>,
    ) -> Result<Result<Turn, ProviderError>, Halted> {
        let cancel = self.emitter.cancel.clone();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halted),
            opened = self.agent.provider.stream(request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Ok(Err(e)),
        };

        let mut acc = FragmentAccumulator::new();
        let mut turn_started = false;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Halted),
                next = stream.recv() => next,
            };
            let chunk = match next {
                None => break,
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Ok(Err(e)),
            };
            if let Some(usage) = &chunk.usage {
                debug!(total_tokens = usage.total_tokens, "Turn usage");
            }
            if let Some(text) = acc.push(&chunk) {
                let visible = match marker.as_deref_mut() {
                    Some(filter) => filter.push(text),
                    None => text.to_string(),
                };
                self.emit_text(visible, &mut turn_started).await?;
            }
        }

        if let Some(filter) = marker {
            let rest = filter.flush();
            self.emit_text(rest, &mut turn_started).await?;
        }
        Ok(Ok(acc.finish()))
    }

    async fn emit_text(&mut self, text: String, turn_started: &mut bool) -> Result<(), Halted> {
        if text.is_empty() {
            return Ok(());
        }
        if !*turn_started && !self.full_text.is_empty() {
            self.full_text.push_str(TURN_SEPARATOR);
            self.emit(AgentEvent::TextDelta {
                content: TURN_SEPARATOR.into(),
            })
            .await?;
        }
        *turn_started = true;
        self.full_text.push_str(&text);
        self.emit(AgentEvent::TextDelta { content: text }).await
    }

    async fn run_tool(&mut self, call: FinalizedCall) -> Result<(), Halted> {
        let call = match call {
            FinalizedCall::Ready(call) => call,
            FinalizedCall::Malformed { id, name, error, .. } => {
                let error = format!("Invalid arguments for {name}: {error}");
                self.history
                    .push(Message::tool_result(&id, json!({ "error": error }).to_string()));
                return self.emit(AgentEvent::ToolError { id, name, error }).await;
            }
        };

        self.emit(AgentEvent::ToolStart {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        })
        .await?;

        info!(tool = %call.name, id = %call.id, "Executing tool");
        let cancel = self.emitter.cancel.clone();
        let ctx = ToolContext {
            conversation_id: self.agent.conversation_id.clone(),
            events: Some(self.emitter.tx.clone()),
            cancel: cancel.child_token(),
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halted),
            result = self.agent.tools.execute(&call.name, call.arguments, &ctx) => result,
        };

        self.history
            .push(Message::tool_result(&call.id, result.to_string()));
        let event = match result_error(&result) {
            Some(error) => {
                debug!(tool = %call.name, error = %error, "Tool returned an error");
                AgentEvent::ToolError {
                    id: call.id,
                    name: call.name,
                    error,
                }
            }
            None => AgentEvent::ToolResult {
                id: call.id,
                name: call.name,
                result,
            },
        };
        self.emit(event).await
    }

    async fn finish(&mut self, marker_seen: bool) -> Result<(), Halted> {
        if marker_seen {
            self.agent.policy.on_marker().await;
            self.emit(AgentEvent::OnboardingComplete {}).await?;
        }
        info!(chars = self.full_text.len(), "Agent run finished");
        self.emit(AgentEvent::Done {
            content: self.full_text.clone(),
        })
        .await
    }

    async fn emit(&self, event: AgentEvent) -> Result<(), Halted> {
        self.emitter.emit(event).await
    }
}

/// The assistant turn as recorded in history. Malformed calls keep their
/// place with empty arguments so every tool message stays paired.
fn assistant_message(turn: &Turn) -> Message {
    let calls = turn
        .calls
        .iter()
        .map(|call| MessageToolCall {
            id: call.id().to_string(),
            name: call.name().to_string(),
            arguments: match call {
                FinalizedCall::Ready(c) => c.arguments.to_string(),
                FinalizedCall::Malformed { .. } => "{}".into(),
            },
        })
        .collect();
    Message::assistant_with_tools(turn.text.clone(), calls)
}

/// Removes a sentinel from streamed text.
///
/// Text that could still turn into the sentinel is held back, along with
/// any whitespace right before it, so the sentinel never reaches the client
/// and the emitted text ends where the visible message ends.
struct MarkerFilter {
    marker: String,
    pending: String,
    seen: bool,
}

impl MarkerFilter {
    fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            pending: String::new(),
            seen: false,
        }
    }

    /// Returns the text that is safe to emit now.
    fn push(&mut self, text: &str) -> String {
        self.pending.push_str(text);
        while let Some(pos) = self.pending.find(&self.marker) {
            self.pending.replace_range(pos..pos + self.marker.len(), "");
            self.seen = true;
        }
        let keep = self.held_len();
        let emit_to = self.pending.len() - keep;
        self.pending.drain(..emit_to).collect()
    }

    /// Releases what is held at the end of a turn. Once the marker was seen
    /// the trailing whitespace is dropped.
    fn flush(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        if self.seen {
            rest.trim_end().to_string()
        } else {
            rest
        }
    }

    fn held_len(&self) -> usize {
        let partial = self
            .pending
            .char_indices()
            .map(|(i, _)| &self.pending[i..])
            .find(|suffix| self.marker.starts_with(suffix))
            .map_or(0, str::len);
        let head = &self.pending[..self.pending.len() - partial];
        partial + (head.len() - head.trim_end().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        RecordingTool, ScriptedProvider, StubTool, deltas_text, text_turn, tool_turn,
    };
    use shortlist_core::provider::{StreamChunk, ToolCallDelta};
    use std::collections::HashMap;

    fn agent(provider: ScriptedProvider, tools: ToolRegistry) -> AgentLoop {
        AgentLoop::new(
            Arc::new(provider),
            "test-model",
            tools,
            Arc::new(FixedPrompt("You are a test agent.".into())),
        )
    }

    fn terminal_pairs_ok(events: &[AgentEvent]) -> bool {
        let mut open: HashMap<String, bool> = HashMap::new();
        for event in events {
            match event {
                AgentEvent::ToolStart { id, .. } => {
                    if open.insert(id.clone(), true).is_some() {
                        return false;
                    }
                }
                AgentEvent::ToolResult { id, .. } | AgentEvent::ToolError { id, .. } => {
                    if open.get(id) == Some(&true) {
                        open.insert(id.clone(), false);
                    }
                }
                _ => {}
            }
        }
        open.values().all(|still_open| !still_open)
    }

    #[tokio::test]
    async fn text_only_turn_finishes_with_done() {
        let provider = ScriptedProvider::new(vec![text_turn(&["Hello", ", ", "world"])]);
        let events = agent(provider, ToolRegistry::new())
            .run(vec![Message::user("hi")])
            .collect()
            .await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events.last(),
            Some(&AgentEvent::Done {
                content: "Hello, world".into()
            })
        );
    }

    #[tokio::test]
    async fn deltas_concatenate_to_done_across_turns() {
        let provider = ScriptedProvider::new(vec![
            tool_turn("Checking your jobs.", &[("call_1", "record", json!({"label": "a"}))]),
            text_turn(&["You have ", "two jobs."]),
        ]);
        let (tool, _calls) = RecordingTool::new("record");
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(tool));

        let events = agent(provider, tools).run(vec![Message::user("jobs?")]).collect().await;

        let Some(AgentEvent::Done { content }) = events.last() else {
            panic!("run did not finish: {events:?}");
        };
        assert_eq!(&deltas_text(&events), content);
        assert_eq!(content, "Checking your jobs.\n\nYou have two jobs.");
    }

    #[tokio::test]
    async fn tool_calls_run_in_requested_order() {
        let provider = ScriptedProvider::new(vec![
            tool_turn(
                "",
                &[
                    ("a", "record", json!({"label": "A"})),
                    ("b", "record", json!({"label": "B"})),
                    ("c", "record", json!({"label": "C"})),
                ],
            ),
            text_turn(&["done"]),
        ]);
        let (tool, calls) = RecordingTool::new("record");
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(tool));

        let events = agent(provider, tools).run(vec![]).collect().await;

        assert_eq!(*calls.lock().unwrap(), vec!["A", "B", "C"]);
        let order: Vec<(&str, &str)> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::ToolStart { id, .. } => Some(("start", id.as_str())),
                AgentEvent::ToolResult { id, .. } => Some(("result", id.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("start", "a"),
                ("result", "a"),
                ("start", "b"),
                ("result", "b"),
                ("start", "c"),
                ("result", "c"),
            ]
        );
        assert!(terminal_pairs_ok(&events));
    }

    #[tokio::test]
    async fn history_pairs_tool_messages() {
        let provider = ScriptedProvider::new(vec![
            tool_turn("", &[("x", "stub", json!({})), ("y", "missing_tool", json!({}))]),
            text_turn(&["ok"]),
        ]);
        let requests = provider.requests();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new("stub", json!({"ok": true}))));

        agent(provider, tools).run(vec![Message::user("go")]).collect().await;

        let requests = requests.lock().unwrap();
        let second = &requests[1];
        assert_eq!(second.messages[0].role, Role::System);
        assert!(shortlist_core::message::tool_pairing_is_valid(&second.messages));
        let tool_messages: Vec<&str> = second
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(tool_messages[0], r#"{"ok":true}"#);
        assert!(tool_messages[1].contains("Unknown tool: missing_tool"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_tool_error_and_run_continues() {
        let provider = ScriptedProvider::new(vec![
            tool_turn("", &[("t1", "teleport", json!({"to": "Mars"}))]),
            text_turn(&["Sorry, I can't do that."]),
        ]);
        let events = agent(provider, ToolRegistry::new()).run(vec![]).collect().await;

        assert!(events.contains(&AgentEvent::ToolError {
            id: "t1".into(),
            name: "teleport".into(),
            error: "Unknown tool: teleport".into(),
        }));
        assert!(matches!(events.last(), Some(AgentEvent::Done { .. })));
        assert!(terminal_pairs_ok(&events));
    }

    #[tokio::test]
    async fn iteration_cap_is_fatal() {
        let cap: usize = 3;
        let turns = (0..=cap)
            .map(|i| {
                let id = format!("c{i}");
                tool_turn("", &[(id.as_str(), "stub", json!({}))])
            })
            .collect();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new("stub", json!({}))));

        let events = agent(ScriptedProvider::new(turns), tools)
            .with_max_iterations(cap as u32)
            .run(vec![])
            .collect()
            .await;

        let errors: Vec<&AgentEvent> = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Error { .. }))
            .collect();
        assert_eq!(
            errors,
            vec![&AgentEvent::Error {
                message: MAX_ITERATIONS_MESSAGE.into()
            }]
        );
        assert!(matches!(events.last(), Some(AgentEvent::Error { .. })));
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Done { .. })));
        let starts = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::ToolStart { .. }))
            .count();
        assert_eq!(starts, cap);
    }

    #[tokio::test]
    async fn provider_failure_is_fatal() {
        let provider = ScriptedProvider::new(vec![vec![
            Ok(StreamChunk::text("Partial ")),
            Err(ProviderError::StreamInterrupted("connection reset".into())),
        ]]);
        let events = agent(provider, ToolRegistry::new()).run(vec![]).collect().await;

        assert_eq!(
            events,
            vec![
                AgentEvent::TextDelta {
                    content: "Partial ".into()
                },
                AgentEvent::Error {
                    message: "Stream interrupted: connection reset".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn malformed_arguments_become_tool_error_without_start() {
        let provider = ScriptedProvider::new(vec![
            vec![Ok(StreamChunk::tool(ToolCallDelta {
                index: 0,
                id: None,
                name: Some("stub".into()),
                arguments: "{\"company\": ".into(),
            }))],
            text_turn(&["Let me try again."]),
        ]);
        let requests = provider.requests();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new("stub", json!({}))));

        let events = agent(provider, tools).run(vec![]).collect().await;

        let AgentEvent::ToolError { id, name, error } = &events[0] else {
            panic!("expected tool_error first: {events:?}");
        };
        assert!(id.starts_with("call_"));
        assert_eq!(name, "stub");
        assert!(error.contains("not valid JSON"));
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::ToolStart { .. })));

        let requests = requests.lock().unwrap();
        let second = &requests[1];
        assert!(shortlist_core::message::tool_pairing_is_valid(&second.messages));
        let assistant = second
            .messages
            .iter()
            .find(|m| m.role == Role::Assistant)
            .unwrap();
        assert_eq!(assistant.tool_calls[0].arguments, "{}");
    }

    #[tokio::test]
    async fn cancel_keeps_delivered_text_and_stops_events() {
        let provider = ScriptedProvider::new(vec![
            vec![
                Ok(StreamChunk::text("First ")),
                Ok(StreamChunk::text("second ")),
                Ok(StreamChunk::text("third")),
                Ok(StreamChunk::tool(ToolCallDelta {
                    index: 0,
                    id: Some("t".into()),
                    name: Some("stub".into()),
                    arguments: "{}".into(),
                })),
            ],
            text_turn(&["never"]),
        ])
        .gated();
        let gate = provider.gate();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new("stub", json!({}))));

        let mut run = agent(provider, tools).run(vec![]);
        gate.release(2);
        assert!(matches!(run.recv().await, Some(AgentEvent::TextDelta { .. })));
        assert!(matches!(run.recv().await, Some(AgentEvent::TextDelta { .. })));

        run.cancel();
        gate.release(10);

        assert_eq!(run.partial_text(), "First second ");
        assert_eq!(run.recv().await, None);
        assert_eq!(run.recv().await, None);
    }

    #[tokio::test]
    async fn system_prompt_is_reevaluated_each_turn() {
        struct Counting(std::sync::atomic::AtomicUsize);

        #[async_trait]
        impl TurnPolicy for Counting {
            async fn system_prompt(&self) -> String {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                format!("prompt #{n}")
            }
        }

        let provider = ScriptedProvider::new(vec![
            tool_turn("", &[("s", "stub", json!({}))]),
            text_turn(&["ok"]),
        ]);
        let requests = provider.requests();
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new("stub", json!({}))));

        AgentLoop::new(
            Arc::new(provider),
            "m",
            tools,
            Arc::new(Counting(Default::default())),
        )
        .run(vec![Message::system("ignored"), Message::user("go")])
        .collect()
        .await;

        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].messages[0].content, "prompt #0");
        assert_eq!(requests[1].messages[0].content, "prompt #1");
        assert_eq!(
            requests[0].messages.iter().filter(|m| m.role == Role::System).count(),
            1
        );
    }

    #[tokio::test]
    async fn tool_context_carries_conversation() {
        let provider = ScriptedProvider::new(vec![
            tool_turn("", &[("s", "whoami", json!({}))]),
            text_turn(&["ok"]),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(crate::test_helpers::ConversationEchoTool));

        let events = agent(provider, tools)
            .with_conversation(ConversationId::from("conv-9"))
            .run(vec![])
            .collect()
            .await;

        assert!(events.contains(&AgentEvent::ToolResult {
            id: "s".into(),
            name: "whoami".into(),
            result: json!({"conversation_id": "conv-9"}),
        }));
    }

    #[test]
    fn marker_split_across_chunks_is_removed() {
        let mut filter = MarkerFilter::new("[DONE_MARK]");
        let mut out = String::new();
        for piece in ["All set.", "\n[DONE", "_MA", "RK]", "\n"] {
            out.push_str(&filter.push(piece));
        }
        out.push_str(&filter.flush());
        assert!(filter.seen);
        assert_eq!(out, "All set.");
    }

    #[test]
    fn near_miss_is_released() {
        let mut filter = MarkerFilter::new("[DONE_MARK]");
        let mut out = filter.push("Use [DONE");
        assert_eq!(out, "Use");
        out.push_str(&filter.push("] brackets"));
        out.push_str(&filter.flush());
        assert!(!filter.seen);
        assert_eq!(out, "Use [DONE] brackets");
    }
}
