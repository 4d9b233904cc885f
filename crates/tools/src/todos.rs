//! Turn a job posting into a checklist of application steps.
//!
//! The posting is scraped, a single model call extracts the concrete steps
//! as a JSON array, and the validated steps replace the job's todo list.

use crate::json_reply::extract_json_array;
use crate::scrape_url::scrape;
use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_core::error::{StoreError, ToolError};
use shortlist_core::message::Message;
use shortlist_core::provider::{Provider, ProviderRequest};
use shortlist_core::records::{NewTodo, TodoCategory};
use shortlist_core::store::{JobStore, TodoStore};
use shortlist_core::tool::{Tool, ToolContext, opt_i64};
use std::sync::Arc;
use tracing::{info, warn};

pub const APPLICATION_TODO_PROMPT: &str = r#"You are a job application requirements extractor. Given the raw text scraped from a job posting, identify the specific application steps the applicant must complete.

## Instructions
Extract ONLY concrete action items that the job posting explicitly asks applicants to do:
- Documents to submit (resume, cover letter, portfolio, transcript, writing samples)
- Short-answer questions or essay prompts (include the FULL question text)
- Assessments or tests to complete (coding challenges, skills tests)
- References to provide (letters of recommendation, reference contacts)
- Any other specific step (e.g. "include salary expectations", "state start date")

## Rules
- Only include items that are explicitly mentioned or clearly implied by the posting
- Do not invent generic steps; if the posting doesn't mention a cover letter, don't add one
- For questions, put the full prompt text in the description
- Keep titles short but descriptive
- Order items in the sequence they should be completed

## Output Format
Return a JSON array of objects, each with:
- "category": one of "document", "question", "assessment", "reference", "other"
- "title": short label (e.g. "Submit resume", "Answer: Why this company?")
- "description": extra detail, or an empty string

Return JSON only. If the posting has no specific steps beyond a generic apply button, return []."#;

/// Validates one extracted item. Items without a title are dropped.
fn validate_todo(item: &Value, sort_order: u32) -> Option<NewTodo> {
    let field = |key: &str| item.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("");
    let title = field("title");
    if title.is_empty() {
        return None;
    }
    Some(NewTodo {
        category: TodoCategory::parse_lenient(field("category")),
        title: title.to_string(),
        description: field("description").to_string(),
        sort_order,
    })
}

/// Validated todos from a model reply, numbered in order. `None` when the
/// reply holds no JSON array.
pub fn todos_from_reply(reply: &str) -> Option<Vec<NewTodo>> {
    let items = extract_json_array(reply)?;
    Some(
        items
            .iter()
            .filter_map(|item| validate_todo(item, 0))
            .enumerate()
            .map(|(i, mut todo)| {
                todo.sort_order = i as u32;
                todo
            })
            .collect(),
    )
}

pub struct ExtractApplicationTodosTool {
    client: reqwest::Client,
    jobs: Arc<dyn JobStore>,
    todos: Arc<dyn TodoStore>,
    provider: Arc<dyn Provider>,
    model: String,
}

impl ExtractApplicationTodosTool {
    pub fn new(
        client: reqwest::Client,
        jobs: Arc<dyn JobStore>,
        todos: Arc<dyn TodoStore>,
        provider: Arc<dyn Provider>,
        model: String,
    ) -> Self {
        Self {
            client,
            jobs,
            todos,
            provider,
            model,
        }
    }

    async fn extract(&self, posting_text: &str) -> Result<Vec<NewTodo>, ToolError> {
        let request = ProviderRequest::new(
            self.model.clone(),
            vec![Message::user(format!(
                "## Scraped Job Posting Text\n\n{posting_text}"
            ))],
        )
        .with_system(APPLICATION_TODO_PROMPT)
        .with_temperature(0.0);

        let reply = self.provider.invoke(request).await?;
        todos_from_reply(&reply).ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "extract_application_todos".into(),
            reason: "model did not return a JSON array".into(),
        })
    }
}

#[async_trait]
impl Tool for ExtractApplicationTodosTool {
    fn name(&self) -> &str {
        "extract_application_todos"
    }

    fn description(&self) -> &str {
        "Extract application todos (required documents, questions, assessments, references) \
         from a job's posting URL and save them to the job's todo list."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "job_id": { "type": "integer", "description": "Job ID to extract todos for" }
            },
            "required": ["job_id"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let job_id = opt_i64(&arguments, "job_id")
            .ok_or_else(|| ToolError::InvalidArguments("'job_id' must be an integer".into()))?;
        let job = self.jobs.get(job_id).await?.ok_or_else(|| {
            ToolError::Store(StoreError::NotFound {
                kind: "Job",
                id: job_id.to_string(),
            })
        })?;
        let Some(url) = job.details.url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(ToolError::InvalidArguments(format!(
                "Job {job_id} has no URL to extract todos from"
            )));
        };

        let posting = scrape(&self.client, url).await?;
        let extracted = match self.extract(&posting).await {
            Ok(todos) => todos,
            Err(e) => {
                warn!(job_id, error = %e, "Todo extraction failed");
                return Err(e);
            }
        };

        let todos = self.todos.replace(job_id, extracted).await?;
        info!(job_id, count = todos.len(), "Application todos extracted");
        Ok(json!({ "job_id": job_id, "count": todos.len(), "todos": todos }))
    }
}
