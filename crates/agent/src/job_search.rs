//! The job-search sub-agent.
//!
//! A bounded agent run that searches job boards and the web, rates each
//! candidate against the user's profile, and records good fits as pending
//! search results for the conversation. Its text becomes `search_progress`
//! events and each recorded result a `search_result_added` event, both sent
//! through the caller's tool context.
//!
//! The chat agent reaches it through [`RunJobSearchTool`]; the gateway also
//! runs it directly for its dedicated search endpoint.

use crate::loop_runner::{AgentLoop, FixedPrompt};
use crate::prompts::{job_search_system_prompt, resume_status};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shortlist_config::AgentConfig;
use shortlist_core::error::ToolError;
use shortlist_core::event::AgentEvent;
use shortlist_core::message::{ConversationId, Message};
use shortlist_core::records::NewSearchResult;
use shortlist_core::store::SearchResultStore;
use shortlist_core::tool::{Tool, ToolContext, ToolRegistry, opt_i64, opt_str, req_str};
use shortlist_tools::{ToolDeps, default_registry};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ADD_SEARCH_RESULT: &str = "add_search_result";

/// Tools the sub-agent may call, besides `add_search_result`.
pub const SEARCH_TOOLS: &[&str] = &[
    "job_search",
    "web_search",
    "scrape_url",
    "read_user_profile",
    "read_resume",
];

const SUMMARY_CHARS: usize = 500;
const EMPTY_SUMMARY: &str = "Search completed.";

/// What to search for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub remote_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    fn from_arguments(arguments: &Value) -> Result<Self, ToolError> {
        Ok(Self {
            query: req_str(arguments, "query")?.to_string(),
            location: opt_str(arguments, "location").map(String::from),
            remote_only: arguments
                .get("remote_only")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            salary_min: opt_i64(arguments, "salary_min"),
            salary_max: opt_i64(arguments, "salary_max"),
        })
    }

    /// The opening user message of the sub-run.
    fn user_message(&self) -> String {
        let mut lines = vec![format!("Search request: {}", self.query)];
        if let Some(location) = &self.location {
            lines.push(format!("Location: {location}"));
        }
        if self.remote_only {
            lines.push("Remote only: yes".into());
        }
        if let Some(min) = self.salary_min {
            lines.push(format!("Minimum salary: ${min}"));
        }
        if let Some(max) = self.salary_max {
            lines.push(format!("Maximum salary: ${max}"));
        }
        lines.join("\n")
    }
}

/// What a finished search reports back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Results recorded for the conversation, including earlier searches.
    pub results_added: usize,
    pub summary: String,
}

#[derive(Debug, Default)]
struct Tally {
    urls_seen: HashSet<String>,
    results_added: usize,
}

/// Records a rated candidate as a pending search result.
///
/// Enforces the per-conversation cap, skips URLs already recorded and
/// rejects ratings below the fit threshold.
pub struct AddSearchResultTool {
    store: Arc<dyn SearchResultStore>,
    conversation_id: ConversationId,
    max_results: usize,
    min_fit: i64,
    tally: Arc<Mutex<Tally>>,
}

impl AddSearchResultTool {
    /// Builds the tool, seeding its tally from results the conversation
    /// already has.
    pub async fn load(
        store: Arc<dyn SearchResultStore>,
        conversation_id: ConversationId,
        max_results: usize,
        min_fit: i64,
    ) -> Result<Self, ToolError> {
        let existing = store.list(&conversation_id, None).await?;
        let tally = Tally {
            urls_seen: existing.iter().filter_map(|r| r.url.clone()).collect(),
            results_added: existing.len(),
        };
        Ok(Self {
            store,
            conversation_id,
            max_results,
            min_fit,
            tally: Arc::new(Mutex::new(tally)),
        })
    }

    async fn results_added(&self) -> usize {
        self.tally.lock().await.results_added
    }
}

#[async_trait]
impl Tool for AddSearchResultTool {
    fn name(&self) -> &str {
        ADD_SEARCH_RESULT
    }

    fn description(&self) -> &str {
        "Record a job that fits the user well enough to show in the search results panel. \
         Only add jobs rated at or above the fit threshold."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company": { "type": "string", "description": "Company name" },
                "title": { "type": "string", "description": "Job title" },
                "job_fit": { "type": "integer", "minimum": 0, "maximum": 5, "description": "Fit rating from 0 to 5" },
                "url": { "type": "string", "description": "Posting URL, preferably on the employer's site" },
                "salary_min": { "type": "integer" },
                "salary_max": { "type": "integer" },
                "location": { "type": "string" },
                "remote_type": { "type": "string", "description": "remote, hybrid or onsite" },
                "source": { "type": "string", "description": "Where the listing was found" },
                "description": { "type": "string", "description": "Short role summary" },
                "requirements": { "type": "string" },
                "nice_to_haves": { "type": "string" },
                "fit_reason": { "type": "string", "description": "One sentence explaining the rating" }
            },
            "required": ["company", "title", "job_fit"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let mut tally = self.tally.lock().await;
        if tally.results_added >= self.max_results {
            return Ok(json!({
                "status": "limit_reached",
                "message": format!("Result limit ({}) reached. Stop searching.", self.max_results),
            }));
        }

        let url = opt_str(&arguments, "url").map(String::from);
        if let Some(url) = url.as_deref().filter(|u| tally.urls_seen.contains(*u)) {
            debug!(url, "Skipping duplicate search result");
            return Ok(json!({
                "status": "duplicate",
                "message": format!("Job at {url} already in results."),
            }));
        }

        let job_fit = opt_i64(&arguments, "job_fit")
            .ok_or_else(|| {
                ToolError::InvalidArguments("'job_fit' must be an integer from 0 to 5".into())
            })?
            .clamp(0, 5);
        if job_fit < self.min_fit {
            return Ok(json!({
                "status": "below_threshold",
                "message": format!(
                    "Fit {job_fit} is below the threshold of {}. Not added.",
                    self.min_fit
                ),
            }));
        }

        let text = |key: &str| opt_str(&arguments, key).map(String::from);
        let result = NewSearchResult {
            company: req_str(&arguments, "company")?.to_string(),
            title: req_str(&arguments, "title")?.to_string(),
            job_fit,
            url: url.clone(),
            salary_min: opt_i64(&arguments, "salary_min"),
            salary_max: opt_i64(&arguments, "salary_max"),
            location: text("location"),
            remote_type: text("remote_type"),
            source: text("source"),
            description: text("description"),
            requirements: text("requirements"),
            nice_to_haves: text("nice_to_haves"),
            fit_reason: text("fit_reason"),
        };
        let record = self.store.add(&self.conversation_id, result).await?;

        if let Some(url) = url {
            tally.urls_seen.insert(url);
        }
        tally.results_added += 1;
        let result_number = tally.results_added;
        drop(tally);

        info!(
            result_number,
            title = %record.title,
            company = %record.company,
            job_fit,
            "Search result added"
        );
        let id = record.id;
        ctx.emit(AgentEvent::SearchResultAdded(record)).await;

        Ok(json!({ "status": "added", "result_number": result_number, "id": id }))
    }
}

/// Runs bounded job searches for a conversation.
#[derive(Clone)]
pub struct JobSearchAgent {
    deps: ToolDeps,
    tools: ToolRegistry,
    max_iterations: u32,
    max_results: usize,
    min_fit: i64,
    temperature: f32,
}

impl JobSearchAgent {
    pub fn new(deps: ToolDeps, config: &AgentConfig) -> Result<Self, ToolError> {
        let tools = default_registry(&deps)?.subset(SEARCH_TOOLS);
        Ok(Self::with_tools(deps, tools, config))
    }

    /// Uses `tools` instead of the built-in search tools.
    pub fn with_tools(deps: ToolDeps, tools: ToolRegistry, config: &AgentConfig) -> Self {
        Self {
            deps,
            tools,
            max_iterations: config.search_max_iterations,
            max_results: config.search_max_results,
            min_fit: config.search_min_fit,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Runs one search. Events go to `ctx`, which must name a conversation.
    /// Cancelling `ctx.cancel` stops the search.
    pub async fn run(
        &self,
        request: SearchRequest,
        ctx: &ToolContext,
    ) -> Result<SearchOutcome, ToolError> {
        let Some(conversation_id) = ctx.conversation_id.clone() else {
            return Err(ToolError::ExecutionFailed {
                tool_name: "run_job_search".into(),
                reason: "Job search requires an active conversation.".into(),
            });
        };

        ctx.emit(AgentEvent::SearchStarted {
            query: request.query.clone(),
        })
        .await;
        info!(query = %request.query, conversation_id = %conversation_id, "Job search started");

        let add_tool = Arc::new(
            AddSearchResultTool::load(
                self.deps.search_results.clone(),
                conversation_id.clone(),
                self.max_results,
                self.min_fit,
            )
            .await?,
        );
        let mut tools = self.tools.clone();
        tools.register(add_tool.clone());

        let prompt = self.system_prompt().await;
        let agent = AgentLoop::new(
            self.deps.provider.clone(),
            self.deps.model.clone(),
            tools,
            Arc::new(FixedPrompt(prompt)),
        )
        .with_max_iterations(self.max_iterations)
        .with_temperature(self.temperature)
        .with_conversation(conversation_id);

        let mut run = agent.run_with_cancel(
            vec![Message::user(request.user_message())],
            ctx.cancel.child_token(),
        );
        let mut text = String::new();
        while let Some(event) = run.recv().await {
            match event {
                AgentEvent::TextDelta { content } => {
                    text.push_str(&content);
                    ctx.emit(AgentEvent::SearchProgress { content }).await;
                }
                AgentEvent::SearchResultAdded(_) => ctx.emit(event).await,
                AgentEvent::ToolResult { name, .. } if name == ADD_SEARCH_RESULT => {
                    if add_tool.results_added().await >= self.max_results {
                        info!(max_results = self.max_results, "Result limit reached, ending search");
                        run.cancel();
                    }
                }
                AgentEvent::Error { message } => {
                    warn!(error = %message, "Job search ended early");
                    break;
                }
                AgentEvent::Done { .. } => break,
                _ => {}
            }
        }

        let outcome = SearchOutcome {
            results_added: add_tool.results_added().await,
            summary: summarize(&text),
        };
        ctx.emit(AgentEvent::SearchCompleted {
            results_added: outcome.results_added,
        })
        .await;
        info!(results_added = outcome.results_added, "Job search finished");
        Ok(outcome)
    }

    async fn system_prompt(&self) -> String {
        let profile = self.deps.profile.read().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read profile for job search");
            String::new()
        });
        let resume = self.deps.resume.raw_text().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read resume for job search");
            None
        });
        job_search_system_prompt(
            &profile,
            &resume_status(resume.as_deref()),
            self.min_fit,
            self.max_results,
        )
    }
}

/// The last few hundred characters of the sub-agent's text.
fn summarize(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(SUMMARY_CHARS)).collect()
}

/// Delegates a thorough search to the sub-agent.
pub struct RunJobSearchTool {
    agent: JobSearchAgent,
}

impl RunJobSearchTool {
    pub fn new(agent: JobSearchAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Tool for RunJobSearchTool {
    fn name(&self) -> &str {
        "run_job_search"
    }

    fn description(&self) -> &str {
        "Run a thorough background job search. A specialist searches several sources, rates \
         each job against the user's profile, and shows good fits in the search results panel. \
         Returns how many results were added and a short summary."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Role or keywords to search for" },
                "location": { "type": "string", "description": "Preferred location" },
                "remote_only": { "type": "boolean", "description": "Only remote roles" },
                "salary_min": { "type": "integer", "description": "Minimum annual salary" },
                "salary_max": { "type": "integer", "description": "Maximum annual salary" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let request = SearchRequest::from_arguments(&arguments)?;
        let outcome = self.agent.run(request, ctx).await?;
        Ok(json!({
            "results_added": outcome.results_added,
            "summary": outcome.summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        RecordingProfile, ScriptedProvider, ScriptedTurn, StubTool, test_deps, text_turn,
        tool_turn,
    };
    use tokio::sync::mpsc;

    fn config(max_results: usize) -> AgentConfig {
        AgentConfig {
            search_max_results: max_results,
            ..AgentConfig::default()
        }
    }

    fn search_agent(
        provider: ScriptedProvider,
        dir: &std::path::Path,
        max_results: usize,
    ) -> (JobSearchAgent, ToolDeps) {
        let deps = test_deps(
            Arc::new(provider),
            Arc::new(RecordingProfile::with_content("# User Profile\nBackend engineer\n")),
            dir,
        );
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubTool::new(
            "job_search",
            json!({"results": [], "provider": "jsearch", "total": 0}),
        )));
        let agent = JobSearchAgent::with_tools(deps.clone(), tools, &config(max_results));
        (agent, deps)
    }

    fn ctx(conversation: &str) -> (ToolContext, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let ctx = ToolContext {
            conversation_id: Some(ConversationId::from(conversation)),
            events: Some(tx),
            ..ToolContext::default()
        };
        (ctx, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn add(id: &str, company: &str, url: &str, fit: i64) -> (String, &'static str, Value) {
        (
            id.to_string(),
            ADD_SEARCH_RESULT,
            json!({"company": company, "title": "Backend Engineer", "url": url, "job_fit": fit}),
        )
    }

    fn turn_of(calls: &[(String, &'static str, Value)]) -> ScriptedTurn {
        let borrowed: Vec<(&str, &str, Value)> = calls
            .iter()
            .map(|(id, name, args)| (id.as_str(), *name, args.clone()))
            .collect();
        tool_turn("", &borrowed)
    }

    #[test]
    fn user_message_lists_constraints() {
        let request = SearchRequest {
            query: "rust engineer".into(),
            location: Some("Berlin".into()),
            remote_only: true,
            salary_min: Some(90000),
            salary_max: None,
        };
        assert_eq!(
            request.user_message(),
            "Search request: rust engineer\nLocation: Berlin\nRemote only: yes\nMinimum salary: $90000"
        );
    }

    #[test]
    fn summary_keeps_the_tail() {
        assert_eq!(summarize("  "), "Search completed.");
        let long = format!("{}end", "x".repeat(600));
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 500);
        assert!(summary.ends_with("end"));
    }

    #[tokio::test]
    async fn search_records_good_fits_and_reports_events() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(vec![
            tool_turn("Searching job boards.", &[("s1", "job_search", json!({"query": "backend"}))]),
            turn_of(&[
                add("a1", "Acme", "https://acme.example/jobs/1", 4),
                add("a2", "Globex", "https://globex.example/jobs/9", 2),
                add("a3", "Acme", "https://acme.example/jobs/1", 5),
            ]),
            text_turn(&["Found one strong match at Acme."]),
        ]);
        let (agent, deps) = search_agent(provider, dir.path(), 25);
        let (ctx, mut rx) = ctx("conv-1");

        let outcome = agent
            .run(SearchRequest::new("backend engineer"), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.results_added, 1);
        assert!(outcome.summary.ends_with("Found one strong match at Acme."));

        let events = drain(&mut rx);
        assert_eq!(
            events.first(),
            Some(&AgentEvent::SearchStarted {
                query: "backend engineer".into()
            })
        );
        assert_eq!(
            events.last(),
            Some(&AgentEvent::SearchCompleted { results_added: 1 })
        );
        let added: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::SearchResultAdded(r) => Some(r.company.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec!["Acme"]);
        assert!(events.iter().any(|e| matches!(e, AgentEvent::SearchProgress { .. })));
        assert!(!events.iter().any(|e| matches!(
            e,
            AgentEvent::TextDelta { .. } | AgentEvent::ToolStart { .. } | AgentEvent::Done { .. }
        )));

        let stored = deps
            .search_results
            .list(&ConversationId::from("conv-1"), None)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].job_fit, 4);
    }

    #[tokio::test]
    async fn limit_ends_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(vec![
            turn_of(&[
                add("a1", "Acme", "https://acme.example/1", 5),
                add("a2", "Initech", "https://initech.example/2", 4),
            ]),
            text_turn(&["never streamed"]),
        ]);
        let (agent, _deps) = search_agent(provider, dir.path(), 1);
        let (ctx, mut rx) = ctx("conv-2");

        let outcome = agent.run(SearchRequest::new("sre"), &ctx).await.unwrap();

        assert_eq!(outcome.results_added, 1);
        assert_eq!(outcome.summary, "Search completed.");
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&AgentEvent::SearchCompleted { results_added: 1 })
        );
    }

    #[tokio::test]
    async fn add_tool_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let deps = test_deps(
            Arc::new(ScriptedProvider::new(vec![])),
            Arc::new(RecordingProfile::default()),
            dir.path(),
        );
        let conv = ConversationId::from("conv-3");
        deps.search_results
            .add(
                &conv,
                NewSearchResult {
                    company: "Earlier".into(),
                    title: "Engineer".into(),
                    job_fit: 4,
                    url: Some("https://earlier.example".into()),
                    ..NewSearchResult::default()
                },
            )
            .await
            .unwrap();

        let tool = AddSearchResultTool::load(deps.search_results.clone(), conv.clone(), 2, 3)
            .await
            .unwrap();
        let ctx = ToolContext::for_conversation(conv);
        let call = |url: &str, fit: i64| {
            json!({"company": "C", "title": "T", "url": url, "job_fit": fit})
        };

        let dup = tool.execute(call("https://earlier.example", 5), &ctx).await.unwrap();
        assert_eq!(dup["status"], "duplicate");

        let low = tool.execute(call("https://low.example", 2), &ctx).await.unwrap();
        assert_eq!(low["status"], "below_threshold");

        let added = tool.execute(call("https://new.example", 3), &ctx).await.unwrap();
        assert_eq!(added["status"], "added");
        assert_eq!(added["result_number"], 2);

        let full = tool.execute(call("https://more.example", 5), &ctx).await.unwrap();
        assert_eq!(full["status"], "limit_reached");
        assert_eq!(full["message"], "Result limit (2) reached. Stop searching.");
    }

    #[tokio::test]
    async fn search_requires_a_conversation() {
        let dir = tempfile::tempdir().unwrap();
        let (agent, _deps) = search_agent(ScriptedProvider::new(vec![]), dir.path(), 25);
        let tool = RunJobSearchTool::new(agent);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool));

        let result = registry
            .execute("run_job_search", json!({"query": "data engineer"}), &ToolContext::default())
            .await;
        assert_eq!(
            result["error"],
            "run_job_search failed: Job search requires an active conversation."
        );
    }

    #[tokio::test]
    async fn parent_cancel_stops_the_search() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new(vec![text_turn(&["a", "b"])]).gated();
        let (agent, _deps) = search_agent(provider, dir.path(), 25);
        let (ctx, mut rx) = ctx("conv-4");
        ctx.cancel.cancel();

        let outcome = agent.run(SearchRequest::new("anything"), &ctx).await.unwrap();

        assert_eq!(outcome.results_added, 0);
        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::SearchProgress { .. })));
        assert_eq!(
            events.last(),
            Some(&AgentEvent::SearchCompleted { results_added: 0 })
        );
    }
}
