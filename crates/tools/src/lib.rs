//! The tool catalog for Shortlist agents.
//!
//! Tools give the agent its reach into the user's data and the web:
//! search job boards and the web, scrape postings, maintain the job
//! tracker, read and rewrite the profile document, read the resume and
//! turn postings into application todo lists.
//!
//! Tools are registered explicitly by [`default_registry`]; the agent crate
//! adds the sub-agent tools on top.

pub mod job_search;
pub mod jobs;
pub mod json_reply;
pub mod profile;
pub mod resume;
pub mod scrape_url;
pub mod search_results;
pub mod todos;
pub mod web_search;

use shortlist_config::SearchConfig;
use shortlist_core::error::ToolError;
use shortlist_core::provider::Provider;
use shortlist_core::store::{JobStore, ProfileStore, ResumeStore, SearchResultStore, TodoStore};
use shortlist_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Tools whose success means the job list changed. Front ends refresh
/// their tracker view after seeing one of these succeed.
pub const JOB_MUTATING_TOOLS: &[&str] = &["create_job", "update_job", "extract_application_todos"];

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Everything the built-in tools need. Cheap to clone.
#[derive(Clone)]
pub struct ToolDeps {
    pub jobs: Arc<dyn JobStore>,
    pub search_results: Arc<dyn SearchResultStore>,
    pub todos: Arc<dyn TodoStore>,
    pub profile: Arc<dyn ProfileStore>,
    pub resume: Arc<dyn ResumeStore>,
    pub search: SearchConfig,
    /// Backend for tools that make their own single-shot model call.
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

pub(crate) fn http_client() -> Result<reqwest::Client, ToolError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("shortlist/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolError::NotConfigured(format!("HTTP client ({e})")))
}

/// Truncates to at most `max` characters, on a char boundary.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Builds the registry with every built-in tool, in the order the model
/// sees them.
pub fn default_registry(deps: &ToolDeps) -> Result<ToolRegistry, ToolError> {
    let client = http_client()?;
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(web_search::WebSearchTool::new(
        client.clone(),
        deps.search.tavily_api_key.clone(),
    )));
    registry.register(Arc::new(job_search::JobSearchTool::new(
        client.clone(),
        deps.search.clone(),
    )));
    registry.register(Arc::new(scrape_url::ScrapeUrlTool::new(client.clone())));
    registry.register(Arc::new(jobs::CreateJobTool::new(deps.jobs.clone())));
    registry.register(Arc::new(jobs::ListJobsTool::new(deps.jobs.clone())));
    registry.register(Arc::new(jobs::UpdateJobTool::new(deps.jobs.clone())));
    registry.register(Arc::new(profile::ReadUserProfileTool::new(deps.profile.clone())));
    registry.register(Arc::new(profile::UpdateUserProfileTool::new(deps.profile.clone())));
    registry.register(Arc::new(resume::ReadResumeTool::new(deps.resume.clone())));
    registry.register(Arc::new(search_results::ListSearchResultsTool::new(
        deps.search_results.clone(),
    )));
    registry.register(Arc::new(todos::ExtractApplicationTodosTool::new(
        client,
        deps.jobs.clone(),
        deps.todos.clone(),
        deps.provider.clone(),
        deps.model.clone(),
    )));

    Ok(registry)
}
