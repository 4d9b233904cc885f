//! Job tracker tools: create, list and update tracked jobs.

use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::records::{Job, JobDetails, JobFilter, JobUpdate, NewJob};
use shortlist_core::store::JobStore;
use shortlist_core::tool::{Tool, ToolContext, opt_i64, opt_str, req_str};
use std::sync::Arc;
use tracing::info;

/// Schema properties shared by create and update.
fn detail_properties() -> serde_json::Map<String, Value> {
    let props = json!({
        "url": { "type": "string", "description": "Job posting URL" },
        "status": { "type": "string", "description": "Application status (saved, applied, interviewing, offer, rejected)" },
        "notes": { "type": "string", "description": "Notes" },
        "salary_min": { "type": "integer", "description": "Minimum salary" },
        "salary_max": { "type": "integer", "description": "Maximum salary" },
        "location": { "type": "string", "description": "Job location" },
        "remote_type": { "type": "string", "description": "remote, hybrid, or onsite" },
        "tags": { "type": "string", "description": "Comma-separated tags" },
        "contact_name": { "type": "string", "description": "Contact name" },
        "contact_email": { "type": "string", "description": "Contact email" },
        "source": { "type": "string", "description": "Where the job was found" },
        "requirements": { "type": "string", "description": "Requirements (newline-separated)" },
        "nice_to_haves": { "type": "string", "description": "Nice-to-haves (newline-separated)" },
        "job_fit": { "type": "integer", "description": "Job fit rating 0-5" }
    });
    match props {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn to_json(tool_name: &str, job: Job) -> Result<Value, ToolError> {
    serde_json::to_value(job).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    })
}

fn job_details(args: &Value) -> JobDetails {
    let s = |key: &str| opt_str(args, key).map(String::from);
    JobDetails {
        url: s("url"),
        notes: s("notes"),
        salary_min: opt_i64(args, "salary_min"),
        salary_max: opt_i64(args, "salary_max"),
        location: s("location"),
        remote_type: s("remote_type"),
        tags: s("tags"),
        contact_name: s("contact_name"),
        contact_email: s("contact_email"),
        source: s("source"),
        requirements: s("requirements"),
        nice_to_haves: s("nice_to_haves"),
        job_fit: opt_i64(args, "job_fit").map(|f| f.clamp(0, 5)),
    }
}

pub struct CreateJobTool {
    jobs: Arc<dyn JobStore>,
}

impl CreateJobTool {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Tool for CreateJobTool {
    fn name(&self) -> &str {
        "create_job"
    }

    fn description(&self) -> &str {
        "Add a new job application to the tracker."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = detail_properties();
        props.insert("company".into(), json!({ "type": "string", "description": "Company name" }));
        props.insert("title".into(), json!({ "type": "string", "description": "Job title" }));
        json!({
            "type": "object",
            "properties": props,
            "required": ["company", "title"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let new_job = NewJob {
            company: req_str(&arguments, "company")?.to_string(),
            title: req_str(&arguments, "title")?.to_string(),
            status: opt_str(&arguments, "status").map(String::from),
            details: job_details(&arguments),
        };
        let job = self.jobs.create(new_job).await?;
        info!(job_id = job.id, company = %job.company, "Job created");
        to_json("create_job", job)
    }
}

pub struct ListJobsTool {
    jobs: Arc<dyn JobStore>,
}

impl ListJobsTool {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Tool for ListJobsTool {
    fn name(&self) -> &str {
        "list_jobs"
    }

    fn description(&self) -> &str {
        "List and search jobs in the tracker. Filters are case-insensitive partial matches, newest first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "description": "Filter by status" },
                "company": { "type": "string", "description": "Filter by company" },
                "title": { "type": "string", "description": "Filter by title" },
                "url": { "type": "string", "description": "Filter by URL" },
                "limit": { "type": "integer", "description": "Max results", "default": 20 }
            }
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let s = |key: &str| opt_str(&arguments, key).map(String::from);
        let filter = JobFilter {
            status: s("status"),
            company: s("company"),
            title: s("title"),
            url: s("url"),
            limit: opt_i64(&arguments, "limit").unwrap_or(20).clamp(1, 200) as usize,
        };
        let jobs = self.jobs.list(&filter).await?;
        Ok(json!({ "total": jobs.len(), "jobs": jobs }))
    }
}

pub struct UpdateJobTool {
    jobs: Arc<dyn JobStore>,
}

impl UpdateJobTool {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }
}

#[async_trait]
impl Tool for UpdateJobTool {
    fn name(&self) -> &str {
        "update_job"
    }

    fn description(&self) -> &str {
        "Update fields of a tracked job. Only the fields given are changed."
    }

    fn parameters_schema(&self) -> Value {
        let mut props = detail_properties();
        props.insert("job_id".into(), json!({ "type": "integer", "description": "ID of the job to update" }));
        props.insert("company".into(), json!({ "type": "string", "description": "Company name" }));
        props.insert("title".into(), json!({ "type": "string", "description": "Job title" }));
        json!({
            "type": "object",
            "properties": props,
            "required": ["job_id"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let job_id = opt_i64(&arguments, "job_id")
            .ok_or_else(|| ToolError::InvalidArguments("'job_id' must be an integer".into()))?;
        let update = JobUpdate {
            company: opt_str(&arguments, "company").map(String::from),
            title: opt_str(&arguments, "title").map(String::from),
            status: opt_str(&arguments, "status").map(String::from),
            details: job_details(&arguments),
        };

        // Store's NotFound renders as "Job {id} not found".
        let job = self.jobs.update(job_id, update).await?;
        info!(job_id, status = %job.status, "Job updated");
        to_json("update_job", job)
    }
}
