//! Ollama native chat API (`/api/chat`).
//!
//! Streams newline-delimited JSON objects. Tool calls arrive whole, with
//! arguments already decoded and no call id, so each one becomes a single
//! delta under its own index.

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

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client()?,
        })
    }

    fn to_api_messages(messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                }
                .into(),
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: serde_json::from_str(&tc.arguments)
                                .unwrap_or_else(|_| Value::Object(Default::default())),
                        },
                    })
                    .collect(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "stream": stream,
            "options": { "temperature": request.temperature },
        });
        if let Some(max) = request.max_tokens {
            body["options"]["num_predict"] = serde_json::json!(max);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        check_status("ollama", response).await
    }
}

/// Maps one NDJSON line onto a chunk. `next_index` numbers tool calls
/// across the whole response.
fn parse_line(line: &str, next_index: &mut usize) -> Result<Option<StreamChunk>, serde_json::Error> {
    let resp: OllamaResponse = serde_json::from_str(line)?;
    let mut chunk = StreamChunk::default();

    if let Some(message) = resp.message {
        if !message.content.is_empty() {
            chunk.content = Some(message.content);
        }
        for call in message.tool_calls {
            chunk.tool_calls.push(ToolCallDelta {
                index: *next_index,
                id: None,
                name: Some(call.function.name),
                arguments: call.function.arguments.to_string(),
            });
            *next_index += 1;
        }
    }

    if resp.done {
        let prompt = resp.prompt_eval_count.unwrap_or(0);
        let completion = resp.eval_count.unwrap_or(0);
        chunk.usage = Some(Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        });
    }

    let empty = chunk.content.is_none() && chunk.tool_calls.is_empty() && chunk.usage.is_none();
    Ok((!empty).then_some(chunk))
}

/// Sends the chunk for `line`, if any. Returns false once the receiver is gone.
async fn forward_line(
    tx: &mpsc::Sender<Result<StreamChunk, ProviderError>>,
    line: &str,
    next_index: &mut usize,
) -> bool {
    if line.trim().is_empty() {
        return true;
    }
    match parse_line(line, next_index) {
        Ok(Some(chunk)) => tx.send(Ok(chunk)).await.is_ok(),
        Ok(None) => true,
        Err(e) => {
            trace!(error = %e, line = %line, "Ignoring unparseable Ollama line");
            true
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = "ollama", model = %request.model, "Sending completion request");
        let response = self.post(&Self::request_body(&request, false)).await?;
        let resp: OllamaResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Ollama response: {e}"),
        })?;

        let (content, tool_calls) = match resp.message {
            Some(m) => (
                m.content,
                m.tool_calls
                    .into_iter()
                    .map(|c| MessageToolCall {
                        id: String::new(),
                        name: c.function.name,
                        arguments: c.function.arguments.to_string(),
                    })
                    .collect(),
            ),
            None => (String::new(), Vec::new()),
        };
        let prompt = resp.prompt_eval_count.unwrap_or(0);
        let completion = resp.eval_count.unwrap_or(0);

        Ok(ProviderResponse {
            message: Message::assistant_with_tools(content, tool_calls),
            usage: Some(Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            model: resp.model.unwrap_or(request.model),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        debug!(provider = "ollama", model = %request.model, "Sending streaming request");
        let response = self.post(&Self::request_body(&request, true)).await?;
        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut lines = LineBuffer::default();
            let mut next_index = 0;

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                        return;
                    }
                };
                for line in lines.push(&chunk) {
                    if !forward_line(&tx, &line, &mut next_index).await {
                        return;
                    }
                }
            }

            if let Some(rest) = lines.finish() {
                forward_line(&tx, &rest, &mut next_index).await;
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(network_error)?;
        Ok(response.status().is_success())
    }
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_tool_calls_get_sequential_indices() {
        let mut next = 0;
        let first = parse_line(
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"list_jobs","arguments":{"status":"applied"}}}]},"done":false}"#,
            &mut next,
        )
        .unwrap()
        .unwrap();
        let second = parse_line(
            r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"read_resume","arguments":{}}}]},"done":false}"#,
            &mut next,
        )
        .unwrap()
        .unwrap();

        assert_eq!(first.tool_calls[0].index, 0);
        assert!(first.tool_calls[0].id.is_none());
        let args: Value = serde_json::from_str(&first.tool_calls[0].arguments).unwrap();
        assert_eq!(args["status"], "applied");
        assert_eq!(second.tool_calls[0].index, 1);
        assert_eq!(next, 2);
    }

    #[test]
    fn text_line() {
        let mut next = 0;
        let chunk = parse_line(
            r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
            &mut next,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Hello"));
    }

    #[test]
    fn final_line_carries_usage() {
        let mut next = 0;
        let chunk = parse_line(
            r#"{"message":{"role":"assistant","content":""},"done":true,"prompt_eval_count":20,"eval_count":5}"#,
            &mut next,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.usage.unwrap().total_tokens, 25);
    }

    #[test]
    fn empty_line_yields_nothing() {
        let mut next = 0;
        let chunk = parse_line(r#"{"message":{"role":"assistant","content":""},"done":false}"#, &mut next).unwrap();
        assert!(chunk.is_none());
    }

    #[test]
    fn history_tool_arguments_become_objects() {
        let messages = vec![Message::assistant_with_tools(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "create_job".into(),
                arguments: r#"{"company":"Acme"}"#.into(),
            }],
        )];
        let api = OllamaProvider::to_api_messages(&messages);
        assert_eq!(api[0].tool_calls[0].function.arguments["company"], "Acme");
    }
}
