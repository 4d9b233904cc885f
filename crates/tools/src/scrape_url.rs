//! Fetch a page and reduce it to readable text.

use async_trait::async_trait;
use scraper::Html;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::tool::{Tool, ToolContext, req_str};
use tracing::debug;

/// Longest text handed back to the model.
pub const MAX_CONTENT_CHARS: usize = 4000;
const TRUNCATION_MARKER: &str = "\n...(truncated)";

/// Elements whose text is page chrome, not content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header"];

pub struct ScrapeUrlTool {
    client: reqwest::Client,
}

impl ScrapeUrlTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Fetches `url` and returns its visible text, capped at
/// [`MAX_CONTENT_CHARS`].
pub async fn scrape(client: &reqwest::Client, url: &str) -> Result<String, ToolError> {
    let failed = |reason: String| ToolError::ExecutionFailed {
        tool_name: "scrape_url".into(),
        reason: format!("Failed to scrape {url}: {reason}"),
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(failed("URL must start with http:// or https://".into()));
    }

    debug!(url, "Scraping page");
    let html = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?
        .error_for_status()
        .map_err(|e| failed(e.to_string()))?
        .text()
        .await
        .map_err(|e| failed(e.to_string()))?;

    Ok(cap_length(html_to_text(&html)))
}

/// Visible text of an HTML document, one text run per line with runs of
/// whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn cap_length(text: String) -> String {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((end, _)) => format!("{}{TRUNCATION_MARKER}", &text[..end]),
        None => text,
    }
}

#[async_trait]
impl Tool for ScrapeUrlTool {
    fn name(&self) -> &str {
        "scrape_url"
    }

    fn description(&self) -> &str {
        "Scrape a web page and return its text content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The URL to scrape" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = req_str(&arguments, "url")?;
        let content = scrape(&self.client, url).await?;
        Ok(json!({ "content": content, "url": url }))
    }
}
