//! Records the tools read and write: tracked jobs, pending search results and
//! per-job application todos.

use crate::message::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status assigned to a job created without one.
pub const DEFAULT_JOB_STATUS: &str = "saved";

/// A job in the user's tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub status: String,
    #[serde(flatten)]
    pub details: JobDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional job fields shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    pub url: Option<String>,
    pub notes: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub location: Option<String>,
    pub remote_type: Option<String>,
    /// Comma-separated tags.
    pub tags: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub source: Option<String>,
    /// Newline-separated requirements.
    pub requirements: Option<String>,
    /// Newline-separated nice-to-haves.
    pub nice_to_haves: Option<String>,
    /// Fit rating 0-5.
    pub job_fit: Option<i64>,
}

impl JobDetails {
    /// Overwrites every field that `other` sets.
    pub fn merge(&mut self, other: JobDetails) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            url, notes, salary_min, salary_max, location, remote_type, tags,
            contact_name, contact_email, source, requirements, nice_to_haves, job_fit
        );
    }
}

/// Input for creating a job.
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub company: String,
    pub title: String,
    pub status: Option<String>,
    pub details: JobDetails,
}

/// Partial update for an existing job.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub company: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub details: JobDetails,
}

impl Job {
    pub fn apply(&mut self, update: JobUpdate) {
        if let Some(company) = update.company {
            self.company = company;
        }
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.details.merge(update.details);
        self.updated_at = Utc::now();
    }
}

/// Filter for listing jobs. String filters are case-insensitive substring
/// matches, except `status` which must match exactly.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub status: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub limit: usize,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            company: None,
            title: None,
            url: None,
            limit: 20,
        }
    }
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        fn contains(haystack: Option<&str>, needle: &Option<String>) -> bool {
            match needle {
                None => true,
                Some(n) => haystack
                    .map(|h| h.to_lowercase().contains(&n.to_lowercase()))
                    .unwrap_or(false),
            }
        }
        self.status.as_ref().is_none_or(|s| s == &job.status)
            && contains(Some(&job.company), &self.company)
            && contains(Some(&job.title), &self.title)
            && contains(job.details.url.as_deref(), &self.url)
    }
}

/// A candidate found by the job-search sub-agent, waiting for the user to
/// promote it into the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub conversation_id: ConversationId,
    pub company: String,
    pub title: String,
    pub url: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub location: Option<String>,
    pub remote_type: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub nice_to_haves: Option<String>,
    pub job_fit: i64,
    pub fit_reason: Option<String>,
    pub added_to_tracker: bool,
    pub tracker_job_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a search result.
#[derive(Debug, Clone, Default)]
pub struct NewSearchResult {
    pub company: String,
    pub title: String,
    pub job_fit: i64,
    pub url: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub location: Option<String>,
    pub remote_type: Option<String>,
    pub source: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub nice_to_haves: Option<String>,
    pub fit_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoCategory {
    Document,
    Question,
    Assessment,
    Reference,
    Other,
}

impl TodoCategory {
    /// Parses a model-supplied category; anything unrecognised is `Other`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "document" => Self::Document,
            "question" => Self::Question,
            "assessment" => Self::Assessment,
            "reference" => Self::Reference,
            _ => Self::Other,
        }
    }
}

/// One application step for a tracked job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationTodo {
    pub id: i64,
    pub job_id: i64,
    pub category: TodoCategory,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub sort_order: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub category: TodoCategory,
    pub title: String,
    pub description: String,
    pub sort_order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            id: 1,
            company: "Acme Robotics".into(),
            title: "Staff Engineer".into(),
            status: DEFAULT_JOB_STATUS.into(),
            details: JobDetails {
                url: Some("https://acme.example/jobs/7".into()),
                ..JobDetails::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn filter_is_case_insensitive_partial() {
        let filter = JobFilter {
            company: Some("acme".into()),
            title: Some("ENGINEER".into()),
            ..JobFilter::default()
        };
        assert!(filter.matches(&job()));
    }

    #[test]
    fn url_filter_skips_jobs_without_url() {
        let mut j = job();
        j.details.url = None;
        let filter = JobFilter {
            url: Some("acme".into()),
            ..JobFilter::default()
        };
        assert!(!filter.matches(&j));
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut j = job();
        j.apply(JobUpdate {
            status: Some("applied".into()),
            details: JobDetails {
                notes: Some("referred by Sam".into()),
                ..JobDetails::default()
            },
            ..JobUpdate::default()
        });
        assert_eq!(j.status, "applied");
        assert_eq!(j.company, "Acme Robotics");
        assert_eq!(j.details.notes.as_deref(), Some("referred by Sam"));
        assert!(j.details.url.is_some());
    }

    #[test]
    fn job_serializes_flat() {
        let value = serde_json::to_value(job()).unwrap();
        assert_eq!(value["url"], "https://acme.example/jobs/7");
        assert_eq!(value["status"], "saved");
    }

    #[test]
    fn unknown_category_is_other() {
        assert_eq!(TodoCategory::parse_lenient(" Document "), TodoCategory::Document);
        assert_eq!(TodoCategory::parse_lenient("portfolio"), TodoCategory::Other);
    }
}
