//! Anthropic native provider implementation (Messages API).
//!
//! - `x-api-key` header authentication and `anthropic-version` header
//! - System prompt as a top-level field
//! - Tool calls as `tool_use` blocks, results as `tool_result` blocks in a
//!   user turn
//! - Streaming via typed SSE events. A tool call opens with
//!   `content_block_start` carrying id and name, then its input arrives as
//!   `input_json_delta` pieces under the same block index.

use crate::http::{LineBuffer, build_client, check_status, network_error};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shortlist_core::error::ProviderError;
use shortlist_core::message::{Message, MessageToolCall, Role};
use shortlist_core::provider::*;
use tokio::sync::mpsc;
use tracing::{debug, trace};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: build_client()?,
        })
    }

    /// Point at a proxy or test server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Anthropic takes the system prompt as a top-level field.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let (system, rest): (Vec<&Message>, Vec<&Message>) =
            messages.iter().partition(|m| m.role == Role::System);
        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        });
        (system, rest)
    }

    /// Converts the history into content blocks. Consecutive tool results
    /// share one user turn.
    fn to_api_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::User => result.push(AnthropicMessage {
                    role: "user".into(),
                    content: AnthropicContent::Text(msg.content.clone()),
                }),
                Role::Assistant if msg.tool_calls.is_empty() => result.push(AnthropicMessage {
                    role: "assistant".into(),
                    content: AnthropicContent::Text(msg.content.clone()),
                }),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    blocks.extend(msg.tool_calls.iter().map(|tc| ContentBlock::ToolUse {
                        id: tc.id.clone(),
                        name: tc.name.clone(),
                        input: serde_json::from_str::<Value>(&tc.arguments)
                            .ok()
                            .filter(Value::is_object)
                            .unwrap_or_else(|| Value::Object(Default::default())),
                    }));
                    result.push(AnthropicMessage {
                        role: "assistant".into(),
                        content: AnthropicContent::Blocks(blocks),
                    });
                }
                Role::Tool => {
                    let block = ContentBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                    };
                    match result.last_mut() {
                        Some(AnthropicMessage {
                            role,
                            content: AnthropicContent::Blocks(blocks),
                        }) if role == "user" => blocks.push(block),
                        _ => result.push(AnthropicMessage {
                            role: "user".into(),
                            content: AnthropicContent::Blocks(vec![block]),
                        }),
                    }
                }
                Role::System => {}
            }
        }

        result
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> Value {
        let (system, messages) = Self::extract_system(&request.messages);
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
            "stream": stream,
        });
        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        check_status("anthropic", response).await
    }

    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text: t } => text.push_str(&t),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(MessageToolCall {
                        id,
                        name,
                        arguments: input.to_string(),
                    });
                }
                ResponseContentBlock::Other => {}
            }
        }

        ProviderResponse {
            message: Message::assistant_with_tools(text, tool_calls),
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

/// What one streamed event means for the normalized stream.
#[derive(Debug)]
enum StreamEvent {
    Chunk(StreamChunk),
    Stop,
    Skip,
}

fn parse_stream_event(data: &str) -> Result<StreamEvent, ProviderError> {
    let event: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            trace!(error = %e, data = %data, "Ignoring unparseable Anthropic SSE");
            return Ok(StreamEvent::Skip);
        }
    };
    let index = event["index"].as_u64().unwrap_or(0) as usize;

    let chunk = match event["type"].as_str().unwrap_or("") {
        "content_block_start" => {
            let block = &event["content_block"];
            if block["type"].as_str() != Some("tool_use") {
                return Ok(StreamEvent::Skip);
            }
            StreamChunk::tool(ToolCallDelta {
                index,
                id: block["id"].as_str().map(String::from),
                name: block["name"].as_str().map(String::from),
                arguments: String::new(),
            })
        }
        "content_block_delta" => {
            let delta = &event["delta"];
            match delta["type"].as_str().unwrap_or("") {
                "text_delta" => match delta["text"].as_str() {
                    Some(text) if !text.is_empty() => StreamChunk::text(text),
                    _ => return Ok(StreamEvent::Skip),
                },
                "input_json_delta" => StreamChunk::tool(ToolCallDelta {
                    index,
                    arguments: delta["partial_json"].as_str().unwrap_or("").to_string(),
                    ..ToolCallDelta::default()
                }),
                _ => return Ok(StreamEvent::Skip),
            }
        }
        "message_delta" => {
            let Some(out) = event["usage"]["output_tokens"].as_u64() else {
                return Ok(StreamEvent::Skip);
            };
            let inp = event["usage"]["input_tokens"].as_u64().unwrap_or(0);
            StreamChunk {
                usage: Some(Usage {
                    prompt_tokens: inp as u32,
                    completion_tokens: out as u32,
                    total_tokens: (inp + out) as u32,
                }),
                ..StreamChunk::default()
            }
        }
        "message_stop" => return Ok(StreamEvent::Stop),
        "error" => {
            let message = event["error"]["message"]
                .as_str()
                .unwrap_or("unknown stream error")
                .to_string();
            return Err(ProviderError::StreamInterrupted(message));
        }
        _ => return Ok(StreamEvent::Skip),
    };
    Ok(StreamEvent::Chunk(chunk))
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = "anthropic", model = %request.model, "Sending completion request");
        let response = self.post(&Self::request_body(&request, false)).await?;
        let api_resp: AnthropicResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Anthropic response: {e}"),
            })?;
        Ok(Self::response_to_provider_response(api_resp))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        debug!(provider = "anthropic", model = %request.model, "Sending streaming request");
        let response = self.post(&Self::request_body(&request, true)).await?;
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                        return;
                    }
                };

                for line in lines.push(&chunk) {
                    // The `event:` lines repeat the `type` carried in the data.
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    match parse_stream_event(data.trim()) {
                        Ok(StreamEvent::Chunk(chunk)) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                        }
                        Ok(StreamEvent::Stop) => return,
                        Ok(StreamEvent::Skip) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(network_error)?;
        Ok(response.status().is_success())
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
