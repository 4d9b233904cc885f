//! Web search through the Tavily API.

use crate::truncate_chars;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::tool::{Tool, ToolContext, opt_i64, req_str};
use tracing::debug;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: i64 = 10;
const SNIPPET_CHARS: usize = 500;

pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

fn shape_results(response: TavilyResponse) -> Value {
    let results: Vec<Value> = response
        .results
        .into_iter()
        .map(|r| {
            json!({
                "title": r.title,
                "url": r.url,
                "snippet": truncate_chars(&r.content, SNIPPET_CHARS),
            })
        })
        .collect();
    json!({ "results": results })
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using Tavily. Returns titles, URLs and short snippets."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results (max 10)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ToolError::NotConfigured("SEARCH_API_KEY".into()))?;
        let query = req_str(&arguments, "query")?;
        let num_results = opt_i64(&arguments, "num_results")
            .unwrap_or(5)
            .clamp(1, MAX_RESULTS);

        debug!(query, num_results, "Running web search");
        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason,
        };
        let response = self
            .client
            .post(TAVILY_URL)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": num_results,
            }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?
            .error_for_status()
            .map_err(|e| failed(e.to_string()))?;
        let body: TavilyResponse = response.json().await.map_err(|e| failed(e.to_string()))?;

        Ok(shape_results(body))
    }
}
