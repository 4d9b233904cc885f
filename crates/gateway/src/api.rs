//! REST and streaming routes under `/api`.
//!
//! Streaming endpoints answer with SSE; everything else is plain JSON.
//! Errors are `{"error": "..."}` with a matching status code.

use crate::SharedState;
use crate::sse::{Transcript, stream_run, stream_search};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shortlist_agent::{ResumeParseError, SearchRequest};
use shortlist_core::message::{ConversationId, Message};
use shortlist_core::provider::ToolDefinition;
use shortlist_core::records::{Job, JobFilter, SearchResult};
use tracing::{info, warn};

/// Response header naming the conversation a chat stream belongs to.
pub const CONVERSATION_HEADER: &str = "x-conversation-id";

/// Conversation key of the onboarding interview.
const ONBOARDING_CONVERSATION: &str = "onboarding";

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/chat/stream", post(chat_stream))
        .route("/onboarding/stream", post(onboarding_stream))
        .route("/onboarding/status", get(onboarding_status))
        .route("/resume/parse", post(parse_resume))
        .route("/search/stream", post(search_stream))
        .route("/search/{conversation_id}/results", get(search_results))
        .route("/tools", get(list_tools))
        .route("/jobs", get(list_jobs))
        .route("/profile", get(get_profile).put(put_profile))
}

// ── Request/Response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Replaces the history the gateway remembers for the conversation.
    #[serde(default)]
    pub history: Option<Vec<Message>>,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<Message>>,
}

#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub onboarded: bool,
}

#[derive(Debug, Deserialize)]
pub struct ParseResumeRequest {
    pub raw_text: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchStreamRequest {
    pub conversation_id: String,
    #[serde(flatten)]
    pub search: SearchRequest,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultsQuery {
    #[serde(default)]
    pub min_fit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn require_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────────────

async fn chat_stream(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    require_message(&req.message)?;
    let conversation_id = req
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .map(ConversationId)
        .unwrap_or_default();
    let header = HeaderValue::from_str(&conversation_id.0)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "invalid conversation_id"))?;

    let history = state.begin_turn(&conversation_id.0, req.history, Message::user(req.message));
    info!(conversation_id = %conversation_id, messages = history.len(), "Chat stream");
    let run = state.chat.run(Some(conversation_id.clone()), history).await;

    let transcript = Transcript {
        state: state.clone(),
        conversation_id: conversation_id.0,
    };
    let mut response = stream_run(run, transcript).into_response();
    response.headers_mut().insert(CONVERSATION_HEADER, header);
    Ok(response)
}

async fn onboarding_stream(
    State(state): State<SharedState>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Response, ApiError> {
    require_message(&req.message)?;
    let history = state.begin_turn(ONBOARDING_CONVERSATION, req.history, Message::user(req.message));
    let run = state.onboarding.run(history);

    let transcript = Transcript {
        state: state.clone(),
        conversation_id: ONBOARDING_CONVERSATION.to_string(),
    };
    Ok(stream_run(run, transcript).into_response())
}

async fn onboarding_status(
    State(state): State<SharedState>,
) -> Result<Json<OnboardingStatus>, ApiError> {
    let onboarded = state
        .deps
        .profile
        .is_onboarded()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(OnboardingStatus { onboarded }))
}

async fn parse_resume(
    State(state): State<SharedState>,
    Json(req): Json<ParseResumeRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.raw_text.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, ResumeParseError::Empty));
    }
    state
        .deps
        .resume
        .save_raw_text(&req.raw_text)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    match state.parser.parse(&req.raw_text).await {
        Ok(parsed) => Ok(Json(parsed)),
        Err(e) => {
            warn!(error = %e, "Resume parse failed");
            let status = match e {
                ResumeParseError::Empty => StatusCode::BAD_REQUEST,
                ResumeParseError::NoJson => StatusCode::UNPROCESSABLE_ENTITY,
                ResumeParseError::Provider(_) => StatusCode::BAD_GATEWAY,
                ResumeParseError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err(api_error(status, e))
        }
    }
}

async fn search_stream(
    State(state): State<SharedState>,
    Json(req): Json<SearchStreamRequest>,
) -> Result<Response, ApiError> {
    if req.search.query.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query must not be empty"));
    }
    if req.conversation_id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "conversation_id is required"));
    }
    info!(query = %req.search.query, conversation_id = %req.conversation_id, "Search stream");
    let stream = stream_search(
        state.search.clone(),
        req.search,
        ConversationId(req.conversation_id),
    );
    Ok(stream.into_response())
}

async fn search_results(
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<SearchResultsQuery>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let results = state
        .deps
        .search_results
        .list(&ConversationId(conversation_id), query.min_fit)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(results))
}

async fn list_tools(State(state): State<SharedState>) -> Json<Vec<ToolDefinition>> {
    Json(state.chat.tools().definitions())
}

async fn list_jobs(
    State(state): State<SharedState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let filter = JobFilter {
        status: query.status,
        company: query.company,
        limit: query.limit.unwrap_or(JobFilter::default().limit),
        ..JobFilter::default()
    };
    let jobs = state
        .deps
        .jobs
        .list(&filter)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(jobs))
}

async fn get_profile(State(state): State<SharedState>) -> Result<Json<ProfileDocument>, ApiError> {
    let content = state
        .deps
        .profile
        .read()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(ProfileDocument { content }))
}

async fn put_profile(
    State(state): State<SharedState>,
    Json(doc): Json<ProfileDocument>,
) -> Result<StatusCode, ApiError> {
    state
        .deps
        .profile
        .write(&doc.content)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use shortlist_config::{AppConfig, SearchConfig};
    use shortlist_core::error::ProviderError;
    use shortlist_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use shortlist_core::records::NewSearchResult;
    use shortlist_store::{
        FileProfileStore, FileResumeStore, InMemoryJobStore, InMemorySearchResultStore,
        InMemoryTodoStore,
    };
    use shortlist_tools::ToolDeps;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers every request with the same text.
    struct EchoProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(self.reply.clone()),
                usage: None,
                model: request.model,
            })
        }
    }

    pub(crate) fn test_state(reply: &str, dir: &std::path::Path) -> SharedState {
        let provider = Arc::new(EchoProvider {
            reply: reply.to_string(),
        });
        state_with_provider(provider, dir)
    }

    pub(crate) fn state_with_provider(
        provider: Arc<dyn Provider>,
        dir: &std::path::Path,
    ) -> SharedState {
        let deps = ToolDeps {
            jobs: Arc::new(InMemoryJobStore::new()),
            search_results: Arc::new(InMemorySearchResultStore::new()),
            todos: Arc::new(InMemoryTodoStore::new()),
            profile: Arc::new(FileProfileStore::in_dir(dir)),
            resume: Arc::new(FileResumeStore::new(dir)),
            search: SearchConfig::default(),
            provider,
            model: "test-model".into(),
        };
        Arc::new(GatewayState::new(deps, &AppConfig::default()).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `(event, data)` pairs of an SSE body.
    fn parse_sse(body: &str) -> Vec<(String, Value)> {
        let mut frames = Vec::new();
        let mut event = None;
        for line in body.lines() {
            if let Some(name) = line.strip_prefix("event:") {
                event = Some(name.trim().to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                let data = serde_json::from_str(data.trim()).unwrap();
                frames.push((event.take().unwrap_or_default(), data));
            }
        }
        frames
    }

    #[tokio::test]
    async fn chat_stream_emits_deltas_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("Hello there!", dir.path());
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/chat/stream",
                json!({"message": "hi", "conversation_id": "conv-1"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONVERSATION_HEADER], "conv-1");
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let frames = parse_sse(&body_text(response).await);
        let names: Vec<&str> = frames.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(names, vec!["text_delta", "done"]);
        assert_eq!(frames[0].1, json!({"content": "Hello there!"}));
        assert_eq!(frames[1].1, json!({"content": "Hello there!"}));

        let conversation = state.conversation("conv-1").unwrap();
        let contents: Vec<&str> = conversation
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["hi", "Hello there!"]);
    }

    #[tokio::test]
    async fn chat_without_id_gets_one_assigned() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("Hi", dir.path()));

        let response = app
            .oneshot(post_json("/api/chat/stream", json!({"message": "hi"})))
            .await
            .unwrap();

        let id = response.headers()[CONVERSATION_HEADER].to_str().unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("Hi", dir.path()));

        let response = app
            .oneshot(post_json("/api/chat/stream", json!({"message": "  "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"], "message must not be empty");
    }

    #[tokio::test]
    async fn onboarding_marker_completes_the_interview() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("You're all set! [ONBOARDING_COMPLETE]", dir.path());
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/onboarding/stream",
                json!({"message": "That's everything"}),
            ))
            .await
            .unwrap();
        let frames = parse_sse(&body_text(response).await);

        let names: Vec<&str> = frames.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(names.last(), Some(&"done"));
        assert_eq!(names[names.len() - 2], "onboarding_complete");
        let (_, done) = frames.last().unwrap();
        assert_eq!(done["content"], "You're all set!");
        assert!(
            frames
                .iter()
                .all(|(_, data)| !data.to_string().contains("[ONBOARDING_COMPLETE]"))
        );

        let response = app.oneshot(get("/api/onboarding/status")).await.unwrap();
        let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(status, json!({"onboarded": true}));
    }

    #[tokio::test]
    async fn resume_parse_saves_raw_text_and_parsed_json() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("```json\n{\"name\": \"Jane Roe\"}\n```", dir.path());
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/resume/parse",
                json!({"raw_text": "Jane Roe, Rust developer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let parsed: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(parsed, json!({"name": "Jane Roe"}));
        assert_eq!(
            state.deps.resume.raw_text().await.unwrap().as_deref(),
            Some("Jane Roe, Rust developer")
        );
        assert_eq!(state.deps.resume.parsed().await.unwrap(), Some(parsed));
    }

    #[tokio::test]
    async fn resume_reply_without_json_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("I can't parse this.", dir.path()));

        let response = app
            .oneshot(post_json("/api/resume/parse", json!({"raw_text": "some text"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn search_stream_reports_progress_and_completion() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("Nothing matched today.", dir.path()));

        let response = app
            .oneshot(post_json(
                "/api/search/stream",
                json!({"query": "rust engineer", "remote_only": true, "conversation_id": "c9"}),
            ))
            .await
            .unwrap();
        let frames = parse_sse(&body_text(response).await);

        let names: Vec<&str> = frames.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(
            names,
            vec!["search_started", "search_progress", "search_completed", "done"]
        );
        assert_eq!(frames[0].1, json!({"query": "rust engineer"}));
        assert_eq!(frames[2].1, json!({"results_added": 0}));
        assert_eq!(frames[3].1["content"], "Nothing matched today.");
    }

    #[tokio::test]
    async fn search_results_are_listed_best_fit_first() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state("", dir.path());
        let conv = ConversationId::from("c1");
        for (company, fit) in [("Low", 3), ("High", 5)] {
            state
                .deps
                .search_results
                .add(
                    &conv,
                    NewSearchResult {
                        company: company.into(),
                        title: "Engineer".into(),
                        job_fit: fit,
                        ..NewSearchResult::default()
                    },
                )
                .await
                .unwrap();
        }
        let app = build_router(state);

        let response = app
            .oneshot(get("/api/search/c1/results"))
            .await
            .unwrap();
        let results: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(results[0]["company"], "High");
        assert_eq!(results[1]["company"], "Low");
    }

    #[tokio::test]
    async fn tools_endpoint_lists_chat_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("", dir.path()));

        let response = app.oneshot(get("/api/tools")).await.unwrap();
        let tools: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert!(names.contains(&"create_job"));
        assert!(names.contains(&"run_job_search"));
    }

    #[tokio::test]
    async fn profile_round_trips_through_the_api() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("", dir.path()));

        let put = Request::builder()
            .method("PUT")
            .uri("/api/profile")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"content": "# User Profile\nLikes Rust\n"}).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get("/api/profile")).await.unwrap();
        let doc: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(doc["content"].as_str().unwrap().contains("Likes Rust"));
    }

    #[tokio::test]
    async fn jobs_endpoint_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state("", dir.path()));

        let response = app.oneshot(get("/api/jobs?limit=5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "[]");
    }
}
