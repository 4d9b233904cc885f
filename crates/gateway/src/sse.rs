//! Bridges agent event channels onto SSE responses.
//!
//! A forwarder task sits between the agent and the HTTP body. When the
//! client goes away the response channel closes, the forwarder notices and
//! cancels the run, so no tool or model call outlives the connection.

use crate::SharedState;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::Stream;
use shortlist_agent::{AgentRun, JobSearchAgent, SearchRequest};
use shortlist_core::event::AgentEvent;
use shortlist_core::message::ConversationId;
use shortlist_core::tool::ToolContext;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

pub(crate) fn to_sse(event: &AgentEvent) -> SseEvent {
    SseEvent::default()
        .event(event.event_type())
        .data(event.payload().to_string())
}

fn into_sse(
    rx: mpsc::Receiver<AgentEvent>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(|event| Ok(to_sse(&event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Where a finished run's assistant text is recorded.
pub(crate) struct Transcript {
    pub state: SharedState,
    pub conversation_id: String,
}

enum Step {
    Event(AgentEvent),
    Ended,
    Disconnected,
}

/// Streams `run` to the client.
///
/// The final text (or whatever was delivered before a cancel or error) is
/// appended to the transcript.
pub(crate) fn stream_run(
    mut run: AgentRun,
    transcript: Transcript,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel::<AgentEvent>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut final_text = None;
        loop {
            let step = tokio::select! {
                biased;
                _ = tx.closed() => Step::Disconnected,
                event = run.recv() => event.map_or(Step::Ended, Step::Event),
            };
            let event = match step {
                Step::Event(event) => event,
                Step::Ended => break,
                Step::Disconnected => {
                    debug!(conversation_id = %transcript.conversation_id, "Client disconnected, cancelling run");
                    run.cancel();
                    break;
                }
            };
            if let AgentEvent::Done { content } = &event {
                final_text = Some(content.clone());
            }
            if tx.send(event).await.is_err() {
                run.cancel();
                break;
            }
        }

        let text = final_text.unwrap_or_else(|| run.partial_text().to_string());
        transcript
            .state
            .record_reply(&transcript.conversation_id, &text);
    });

    into_sse(rx)
}

/// Streams a standalone job search for `conversation_id`.
///
/// Ends with `done` carrying the search summary, or `error`.
pub(crate) fn stream_search(
    agent: JobSearchAgent,
    request: SearchRequest,
    conversation_id: ConversationId,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel::<AgentEvent>(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let ctx = ToolContext {
        conversation_id: Some(conversation_id),
        events: Some(tx.clone()),
        cancel: cancel.clone(),
    };

    tokio::spawn(async move {
        let search = agent.run(request, &ctx);
        tokio::pin!(search);
        let terminal = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!("Client disconnected, cancelling search");
                cancel.cancel();
                return;
            }
            outcome = &mut search => match outcome {
                Ok(outcome) => AgentEvent::Done { content: outcome.summary },
                Err(e) => {
                    warn!(error = %e, "Job search failed");
                    AgentEvent::Error { message: e.to_string() }
                }
            },
        };
        let _ = tx.send(terminal).await;
    });

    into_sse(rx)
}

#[cfg(test)]
mod tests {
    use crate::api::tests::state_with_provider;
    use crate::build_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use shortlist_core::error::ProviderError;
    use shortlist_core::message::Role;
    use shortlist_core::provider::{
        ChunkStream, Provider, ProviderRequest, ProviderResponse, StreamChunk,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    /// Streams one text chunk, then holds the stream open forever.
    #[derive(Default)]
    struct StallingProvider {
        open: Mutex<Vec<mpsc::Sender<Result<StreamChunk, ProviderError>>>>,
    }

    #[async_trait]
    impl Provider for StallingProvider {
        fn name(&self) -> &str {
            "stalling"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("streaming only".into()))
        }

        async fn stream(&self, _request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
            let (tx, rx) = mpsc::channel(4);
            tx.send(Ok(StreamChunk::text("Hel")))
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;
            self.open.lock().unwrap().push(tx);
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn disconnect_keeps_partial_reply() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_provider(Arc::new(StallingProvider::default()), dir.path());
        let app = build_router(state.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/chat/stream")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"message": "hi", "conversation_id": "gone"}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let first = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(first.contains("text_delta"));
        drop(body);

        let recorded = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(conversation) = state.conversation("gone")
                    && let Some(last) = conversation.messages.last()
                    && last.role == Role::Assistant
                {
                    return last.content.clone();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(recorded, "Hel");
    }
}
