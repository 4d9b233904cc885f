//! Job board search through JSearch (RapidAPI) or Adzuna.
//!
//! Both boards are normalized to one listing shape so the model never has
//! to know which one answered.

use crate::truncate_chars;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shortlist_config::SearchConfig;
use shortlist_core::error::ToolError;
use shortlist_core::tool::{Tool, ToolContext, opt_bool, opt_i64, opt_str, req_str};
use tracing::debug;

const JSEARCH_URL: &str = "https://jsearch.p.rapidapi.com/search";
const JSEARCH_HOST: &str = "jsearch.p.rapidapi.com";
const ADZUNA_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Board {
    JSearch,
    Adzuna,
}

impl Board {
    fn as_str(self) -> &'static str {
        match self {
            Self::JSearch => "jsearch",
            Self::Adzuna => "adzuna",
        }
    }
}

/// One normalized listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote: bool,
    pub employment_type: Option<String>,
    pub posted_date: Option<String>,
    pub source: &'static str,
}

struct SearchParams<'a> {
    query: &'a str,
    location: Option<&'a str>,
    remote_only: bool,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    num_results: i64,
}

pub struct JobSearchTool {
    client: reqwest::Client,
    config: SearchConfig,
}

impl JobSearchTool {
    pub fn new(client: reqwest::Client, config: SearchConfig) -> Self {
        Self { client, config }
    }

    fn has_jsearch(&self) -> bool {
        self.config.jsearch_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn has_adzuna(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|k| !k.is_empty());
        set(&self.config.adzuna_app_id) && set(&self.config.adzuna_app_key)
    }

    /// The explicit choice, then the configured default, then whichever
    /// board has credentials, JSearch first.
    fn pick_board(&self, requested: Option<&str>) -> Result<Board, ToolError> {
        let wanted = requested.or(self.config.default_job_provider.as_deref());
        match wanted.map(str::to_lowercase).as_deref() {
            Some("jsearch") if self.has_jsearch() => Ok(Board::JSearch),
            Some("jsearch") => Err(ToolError::NotConfigured("JSEARCH_API_KEY".into())),
            Some("adzuna") if self.has_adzuna() => Ok(Board::Adzuna),
            Some("adzuna") => Err(ToolError::NotConfigured("ADZUNA_APP_ID/ADZUNA_APP_KEY".into())),
            Some(other) => Err(ToolError::InvalidArguments(format!(
                "Unknown job search provider '{other}' (use 'jsearch' or 'adzuna')"
            ))),
            None if self.has_jsearch() => Ok(Board::JSearch),
            None if self.has_adzuna() => Ok(Board::Adzuna),
            None => Err(ToolError::NotConfigured(
                "Job search API key (JSEARCH_API_KEY or ADZUNA_APP_ID/ADZUNA_APP_KEY)".into(),
            )),
        }
    }

    async fn search_jsearch(&self, p: &SearchParams<'_>) -> Result<(Vec<JobListing>, i64), reqwest::Error> {
        let key = self.config.jsearch_api_key.clone().unwrap_or_default();
        let query = match p.location {
            Some(loc) => format!("{} in {loc}", p.query),
            None => p.query.to_string(),
        };
        let mut params = vec![("query", query), ("num_pages", "1".to_string())];
        if p.remote_only {
            params.push(("remote_jobs_only", "true".into()));
        }

        let body: JSearchResponse = self
            .client
            .get(JSEARCH_URL)
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", JSEARCH_HOST)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total = body.data.len() as i64;
        let listings = body
            .data
            .into_iter()
            .map(JSearchJob::into_listing)
            .filter(|l| salary_in_range(l, p.salary_min, p.salary_max))
            .take(p.num_results as usize)
            .collect();
        Ok((listings, total))
    }

    async fn search_adzuna(&self, p: &SearchParams<'_>) -> Result<(Vec<JobListing>, i64), reqwest::Error> {
        let url = format!("{ADZUNA_URL}/{}/search/1", self.config.adzuna_country);
        let what = if p.remote_only {
            format!("{} remote", p.query)
        } else {
            p.query.to_string()
        };
        let mut params = vec![
            ("app_id", self.config.adzuna_app_id.clone().unwrap_or_default()),
            ("app_key", self.config.adzuna_app_key.clone().unwrap_or_default()),
            ("what", what),
            ("results_per_page", p.num_results.to_string()),
            ("content-type", "application/json".into()),
        ];
        if let Some(loc) = p.location {
            params.push(("where", loc.to_string()));
        }
        if let Some(min) = p.salary_min {
            params.push(("salary_min", min.to_string()));
        }
        if let Some(max) = p.salary_max {
            params.push(("salary_max", max.to_string()));
        }

        let body: AdzunaResponse = self
            .client
            .get(url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let total = body.count.unwrap_or(body.results.len() as i64);
        let listings = body
            .results
            .into_iter()
            .map(AdzunaJob::into_listing)
            .filter(|l| !p.remote_only || l.remote)
            .collect();
        Ok((listings, total))
    }
}

/// Keeps listings whose advertised range overlaps the requested one.
/// Listings without salary data are kept.
fn salary_in_range(listing: &JobListing, min: Option<i64>, max: Option<i64>) -> bool {
    let top = listing.salary_max.or(listing.salary_min);
    let bottom = listing.salary_min.or(listing.salary_max);
    min.is_none_or(|m| top.is_none_or(|t| t >= m)) && max.is_none_or(|m| bottom.is_none_or(|b| b <= m))
}

fn mentions_remote(text: &str) -> bool {
    text.to_lowercase().contains("remote")
}

#[async_trait]
impl Tool for JobSearchTool {
    fn name(&self) -> &str {
        "job_search"
    }

    fn description(&self) -> &str {
        "Search job board APIs (JSearch or Adzuna) for real job listings."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Job search keywords" },
                "location": { "type": "string", "description": "Location filter" },
                "remote_only": { "type": "boolean", "description": "Remote jobs only" },
                "salary_min": { "type": "integer", "description": "Minimum salary" },
                "salary_max": { "type": "integer", "description": "Maximum salary" },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results (max 20)",
                    "default": 10
                },
                "provider": {
                    "type": "string",
                    "enum": ["jsearch", "adzuna"],
                    "description": "Force a specific job board"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let params = SearchParams {
            query: req_str(&arguments, "query")?,
            location: opt_str(&arguments, "location"),
            remote_only: opt_bool(&arguments, "remote_only").unwrap_or(false),
            salary_min: opt_i64(&arguments, "salary_min"),
            salary_max: opt_i64(&arguments, "salary_max"),
            num_results: opt_i64(&arguments, "num_results").unwrap_or(10).clamp(1, 20),
        };
        let board = self.pick_board(opt_str(&arguments, "provider"))?;
        debug!(board = board.as_str(), query = params.query, "Searching job board");

        let outcome = match board {
            Board::JSearch => self.search_jsearch(&params).await,
            Board::Adzuna => self.search_adzuna(&params).await,
        };
        let (results, total) = outcome.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "job_search".into(),
            reason: format!("{} request failed: {e}", board.as_str()),
        })?;

        Ok(json!({
            "results": results,
            "provider": board.as_str(),
            "total": total,
        }))
    }
}

// --- JSearch ---

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JSearchJob {
    job_title: String,
    employer_name: String,
    job_city: Option<String>,
    job_state: Option<String>,
    job_country: Option<String>,
    job_apply_link: Option<String>,
    job_google_link: Option<String>,
    job_description: String,
    job_min_salary: Option<f64>,
    job_max_salary: Option<f64>,
    job_is_remote: bool,
    job_employment_type: Option<String>,
    job_posted_at_datetime_utc: Option<String>,
}

impl JSearchJob {
    fn into_listing(self) -> JobListing {
        let location = [self.job_city, self.job_state, self.job_country]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        JobListing {
            title: self.job_title,
            company: self.employer_name,
            location,
            url: self.job_apply_link.or(self.job_google_link).unwrap_or_default(),
            description: truncate_chars(&self.job_description, DESCRIPTION_CHARS),
            salary_min: self.job_min_salary.map(|s| s as i64),
            salary_max: self.job_max_salary.map(|s| s as i64),
            remote: self.job_is_remote,
            employment_type: self.job_employment_type,
            posted_date: self.job_posted_at_datetime_utc,
            source: "jsearch",
        }
    }
}

// --- Adzuna ---

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    count: Option<i64>,
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaJob {
    title: String,
    company: AdzunaName,
    location: AdzunaName,
    redirect_url: String,
    description: String,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_time: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdzunaName {
    display_name: String,
}

impl AdzunaJob {
    fn into_listing(self) -> JobListing {
        let remote = mentions_remote(&self.title)
            || mentions_remote(&self.location.display_name)
            || mentions_remote(&self.description);
        JobListing {
            title: self.title,
            company: self.company.display_name,
            location: self.location.display_name,
            url: self.redirect_url,
            description: truncate_chars(&self.description, DESCRIPTION_CHARS),
            salary_min: self.salary_min.map(|s| s as i64),
            salary_max: self.salary_max.map(|s| s as i64),
            remote,
            employment_type: self.contract_time,
            posted_date: self.created,
            source: "adzuna",
        }
    }
}
