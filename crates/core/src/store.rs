//! Storage traits for the collaborators the tools mutate.
//!
//! Implementations live in `shortlist-store`. Every implementation must be
//! safe to share between concurrent agent runs.

use crate::error::StoreError;
use crate::message::ConversationId;
use crate::records::{
    ApplicationTodo, Job, JobFilter, JobUpdate, NewJob, NewSearchResult, NewTodo, SearchResult,
};
use async_trait::async_trait;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: NewJob) -> Result<Job, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Job>, StoreError>;

    /// Newest first, at most `filter.limit` jobs.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    async fn update(&self, id: i64, update: JobUpdate) -> Result<Job, StoreError>;
}

#[async_trait]
pub trait SearchResultStore: Send + Sync {
    async fn add(
        &self,
        conversation_id: &ConversationId,
        result: NewSearchResult,
    ) -> Result<SearchResult, StoreError>;

    /// Results for a conversation, best fit first, then oldest first.
    async fn list(
        &self,
        conversation_id: &ConversationId,
        min_fit: Option<i64>,
    ) -> Result<Vec<SearchResult>, StoreError>;
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Replaces the job's todos with `todos`.
    async fn replace(&self, job_id: i64, todos: Vec<NewTodo>)
    -> Result<Vec<ApplicationTodo>, StoreError>;

    async fn list(&self, job_id: i64) -> Result<Vec<ApplicationTodo>, StoreError>;
}

/// The user's markdown profile document and its onboarding flag.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The document body, without frontmatter.
    async fn read(&self) -> Result<String, StoreError>;

    /// Replaces the body. Existing frontmatter is preserved.
    async fn write(&self, content: &str) -> Result<(), StoreError>;

    async fn is_onboarded(&self) -> Result<bool, StoreError>;

    async fn set_onboarded(&self, onboarded: bool) -> Result<(), StoreError>;
}

/// Uploaded resume text plus its structured form once parsed.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn raw_text(&self) -> Result<Option<String>, StoreError>;

    async fn save_raw_text(&self, text: &str) -> Result<(), StoreError>;

    async fn parsed(&self) -> Result<Option<serde_json::Value>, StoreError>;

    async fn save_parsed(&self, parsed: &serde_json::Value) -> Result<(), StoreError>;
}
