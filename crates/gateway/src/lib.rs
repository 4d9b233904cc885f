//! HTTP gateway for Shortlist.
//!
//! Streams agent runs to the browser as Server-Sent Events, one
//! `event: <name>` / `data: <json>` frame per agent event, and exposes the
//! small REST surface the front end needs around them (tools, jobs, profile,
//! search results, resume parsing).
//!
//! Built on Axum. Conversations are kept in memory for the life of the
//! process.

pub mod api;
mod sse;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use shortlist_agent::{ChatAgent, JobSearchAgent, OnboardingAgent, ResumeParser};
use shortlist_config::AppConfig;
use shortlist_core::error::{ProviderError, ToolError};
use shortlist_core::message::{Conversation, ConversationId, Message};
use shortlist_providers::build_from_config;
use shortlist_store::{
    FileProfileStore, FileResumeStore, InMemoryJobStore, InMemorySearchResultStore,
    InMemoryTodoStore,
};
use shortlist_tools::ToolDeps;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

/// Maximum number of in-memory conversations before the oldest is evicted.
const MAX_CONVERSATIONS: usize = 1_000;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub deps: ToolDeps,
    pub chat: ChatAgent,
    pub onboarding: OnboardingAgent,
    pub search: JobSearchAgent,
    pub parser: ResumeParser,
    conversations: Mutex<HashMap<String, Conversation>>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(deps: ToolDeps, config: &AppConfig) -> Result<Self, ToolError> {
        let temperature = config.default_temperature;
        Ok(Self {
            chat: ChatAgent::new(deps.clone(), &config.agent)?.with_temperature(temperature),
            onboarding: OnboardingAgent::new(&deps, &config.agent)?.with_temperature(temperature),
            search: JobSearchAgent::new(deps.clone(), &config.agent)?.with_temperature(temperature),
            parser: ResumeParser::new(deps.provider.clone(), deps.model.clone(), deps.resume.clone()),
            deps,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    /// Records the user's message and returns the history to run on.
    ///
    /// A client-supplied `history` replaces what the gateway remembers.
    pub(crate) fn begin_turn(
        &self,
        conversation_id: &str,
        history: Option<Vec<Message>>,
        message: Message,
    ) -> Vec<Message> {
        let mut conversations = self.conversations.lock().unwrap_or_else(|e| e.into_inner());

        if conversations.len() >= MAX_CONVERSATIONS
            && !conversations.contains_key(conversation_id)
            && let Some(oldest) = conversations
                .iter()
                .min_by_key(|(_, c)| c.updated_at)
                .map(|(k, _)| k.clone())
        {
            debug!(conversation_id = %oldest, "Evicting oldest conversation");
            conversations.remove(&oldest);
        }

        let conversation = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation::new(ConversationId(conversation_id.to_string())));
        if let Some(history) = history {
            conversation.messages = history;
        }
        conversation.push(message);
        conversation.messages.clone()
    }

    /// Appends an assistant reply to a known conversation.
    pub(crate) fn record_reply(&self, conversation_id: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut conversations = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(conversation) = conversations.get_mut(conversation_id) {
            conversation.push(Message::assistant(text));
        }
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        let conversations = self.conversations.lock().unwrap_or_else(|e| e.into_inner());
        conversations.get(conversation_id).cloned()
    }
}

/// Builds the tool dependencies a configuration describes: the default
/// provider, in-memory job data, and the profile and resume files under the
/// data directory.
pub fn deps_from_config(config: &AppConfig) -> Result<ToolDeps, ProviderError> {
    let router = build_from_config(config)?;
    let provider = router
        .default_provider()
        .ok_or_else(|| ProviderError::NotConfigured(config.default_provider.clone()))?;
    let data_dir = config.data_dir();

    Ok(ToolDeps {
        jobs: Arc::new(InMemoryJobStore::new()),
        search_results: Arc::new(InMemorySearchResultStore::new()),
        todos: Arc::new(InMemoryTodoStore::new()),
        profile: Arc::new(FileProfileStore::in_dir(&data_dir)),
        resume: Arc::new(FileResumeStore::new(&data_dir)),
        search: config.search.clone(),
        provider,
        model: router.default_model().to_string(),
    })
}

/// Build the Axum router with every gateway route.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::HeaderName::from_static(api::CONVERSATION_HEADER)]);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::api_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let deps = deps_from_config(&config)?;
    let state = Arc::new(GatewayState::new(deps, &config)?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
