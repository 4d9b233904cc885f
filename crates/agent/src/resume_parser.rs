//! Single-shot resume parsing.
//!
//! One model call turns raw resume text into a structured JSON object. The
//! reply is searched for the object (code fences and surrounding prose are
//! tolerated) and the result is saved through the resume store. A reply
//! without a usable object is an error, never an empty structure.

use crate::prompts::{RESUME_PARSE_SYSTEM, resume_parse_prompt};
use serde_json::Value;
use shortlist_core::error::{ProviderError, StoreError};
use shortlist_core::message::Message;
use shortlist_core::provider::{Provider, ProviderRequest};
use shortlist_core::store::ResumeStore;
use shortlist_tools::json_reply::extract_json_object;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ResumeParseError {
    #[error("Resume text is empty")]
    Empty,

    #[error("Resume parse call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Model response contained no valid JSON object")]
    NoJson,

    #[error("Could not save parsed resume: {0}")]
    Store(#[from] StoreError),
}

pub struct ResumeParser {
    provider: Arc<dyn Provider>,
    model: String,
    resume: Arc<dyn ResumeStore>,
}

impl ResumeParser {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, resume: Arc<dyn ResumeStore>) -> Self {
        Self {
            provider,
            model: model.into(),
            resume,
        }
    }

    /// Parses `raw_text`, stores the result and returns it.
    pub async fn parse(&self, raw_text: &str) -> Result<Value, ResumeParseError> {
        if raw_text.trim().is_empty() {
            return Err(ResumeParseError::Empty);
        }

        let request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(RESUME_PARSE_SYSTEM),
                Message::user(resume_parse_prompt(raw_text)),
            ],
        )
        .with_temperature(0.0);

        debug!(chars = raw_text.len(), "Parsing resume");
        let reply = self.provider.invoke(request).await?;
        let Some(parsed) = extract_json_object(&reply).map(Value::Object) else {
            warn!(reply_chars = reply.len(), "Resume parse reply held no JSON object");
            return Err(ResumeParseError::NoJson);
        };

        self.resume.save_parsed(&parsed).await?;
        info!(
            fields = parsed.as_object().map_or(0, |o| o.len()),
            "Resume parsed"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use serde_json::json;
    use shortlist_store::FileResumeStore;

    fn parser(reply: &str, dir: &std::path::Path) -> (ResumeParser, Arc<FileResumeStore>) {
        let store = Arc::new(FileResumeStore::new(dir));
        let parser = ResumeParser::new(
            Arc::new(ScriptedProvider::replying(reply)),
            "test-model",
            store.clone(),
        );
        (parser, store)
    }

    #[tokio::test]
    async fn json_in_prose_is_extracted_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (parser, store) = parser(
            "Here is the parsed resume:\n{\"name\": \"John Doe\", \"years_experience\": 5}\nLet me know!",
            dir.path(),
        );

        let parsed = parser
            .parse("John Doe, Software Engineer, 5 years Python")
            .await
            .unwrap();

        assert_eq!(parsed, json!({"name": "John Doe", "years_experience": 5}));
        assert_eq!(store.parsed().await.unwrap(), Some(parsed));
    }

    #[tokio::test]
    async fn reply_without_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (parser, store) = parser("Sorry, I could not read that resume.", dir.path());

        let err = parser
            .parse("John Doe, Software Engineer, 5 years Python")
            .await
            .unwrap_err();

        assert!(matches!(err, ResumeParseError::NoJson));
        assert_eq!(store.parsed().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::replying("{}");
        let requests = provider.requests();
        let parser = ResumeParser::new(
            Arc::new(provider),
            "m",
            Arc::new(FileResumeStore::new(dir.path())),
        );

        assert!(matches!(parser.parse("  \n").await, Err(ResumeParseError::Empty)));
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ResumeParser::new(
            Arc::new(ScriptedProvider::new(vec![])),
            "m",
            Arc::new(FileResumeStore::new(dir.path())),
        );
        assert!(matches!(
            parser.parse("text").await,
            Err(ResumeParseError::Provider(_))
        ));
    }
}
