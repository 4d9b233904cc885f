//! In-memory stores, shared behind `Arc<RwLock<..>>`.

use async_trait::async_trait;
use chrono::Utc;
use shortlist_core::error::StoreError;
use shortlist_core::message::ConversationId;
use shortlist_core::records::{
    ApplicationTodo, DEFAULT_JOB_STATUS, Job, JobFilter, JobUpdate, NewJob, NewSearchResult,
    NewTodo, SearchResult,
};
use shortlist_core::store::{JobStore, SearchResultStore, TodoStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Jobs kept in a Vec, ids handed out from an atomic counter.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<Vec<Job>>>,
    next_id: AtomicI64,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn next(counter: &AtomicI64) -> i64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: NewJob) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: next(&self.next_id),
            company: job.company,
            title: job.title,
            status: job.status.unwrap_or_else(|| DEFAULT_JOB_STATUS.to_string()),
            details: job.details,
            created_at: now,
            updated_at: now,
        };
        debug!(id = job.id, company = %job.company, "Job created");
        self.jobs.write().await.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: i64) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        // Newest first; ids break ties between jobs created in the same instant.
        let mut matched: Vec<Job> = jobs.iter().filter(|j| filter.matches(j)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matched.truncate(filter.limit);
        Ok(matched)
    }

    async fn update(&self, id: i64, update: JobUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "Job",
                id: id.to_string(),
            })?;
        job.apply(update);
        Ok(job.clone())
    }
}

#[derive(Default)]
pub struct InMemorySearchResultStore {
    results: Arc<RwLock<Vec<SearchResult>>>,
    next_id: AtomicI64,
}

impl InMemorySearchResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchResultStore for InMemorySearchResultStore {
    async fn add(
        &self,
        conversation_id: &ConversationId,
        result: NewSearchResult,
    ) -> Result<SearchResult, StoreError> {
        let record = SearchResult {
            id: next(&self.next_id),
            conversation_id: conversation_id.clone(),
            company: result.company,
            title: result.title,
            url: result.url,
            salary_min: result.salary_min,
            salary_max: result.salary_max,
            location: result.location,
            remote_type: result.remote_type,
            source: result.source,
            description: result.description,
            requirements: result.requirements,
            nice_to_haves: result.nice_to_haves,
            job_fit: result.job_fit,
            fit_reason: result.fit_reason,
            added_to_tracker: false,
            tracker_job_id: None,
            created_at: Utc::now(),
        };
        self.results.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(
        &self,
        conversation_id: &ConversationId,
        min_fit: Option<i64>,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let results = self.results.read().await;
        let mut matched: Vec<SearchResult> = results
            .iter()
            .filter(|r| &r.conversation_id == conversation_id)
            .filter(|r| min_fit.is_none_or(|min| r.job_fit >= min))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.job_fit
                .cmp(&a.job_fit)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(matched)
    }
}

#[derive(Default)]
pub struct InMemoryTodoStore {
    todos: Arc<RwLock<Vec<ApplicationTodo>>>,
    next_id: AtomicI64,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn replace(
        &self,
        job_id: i64,
        todos: Vec<NewTodo>,
    ) -> Result<Vec<ApplicationTodo>, StoreError> {
        let now = Utc::now();
        let created: Vec<ApplicationTodo> = todos
            .into_iter()
            .map(|t| ApplicationTodo {
                id: next(&self.next_id),
                job_id,
                category: t.category,
                title: t.title,
                description: t.description,
                completed: false,
                sort_order: t.sort_order,
                created_at: now,
            })
            .collect();

        let mut all = self.todos.write().await;
        all.retain(|t| t.job_id != job_id);
        all.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list(&self, job_id: i64) -> Result<Vec<ApplicationTodo>, StoreError> {
        let mut todos: Vec<ApplicationTodo> = self
            .todos
            .read()
            .await
            .iter()
            .filter(|t| t.job_id == job_id)
            .cloned()
            .collect();
        todos.sort_by_key(|t| t.sort_order);
        Ok(todos)
    }
}
