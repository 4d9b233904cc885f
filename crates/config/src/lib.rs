//! Configuration loading and validation for Shortlist.
//!
//! Loads configuration from `~/.shortlist/config.toml` with environment
//! variable overrides for provider selection and every API key.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.shortlist/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the default provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("agent", &self.agent)
            .field("search", &self.search)
            .field("gateway", &self.gateway)
            .field("storage", &self.storage)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Iteration caps and job-search policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool-calling iterations allowed per chat run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_onboarding_max_iterations")]
    pub onboarding_max_iterations: u32,

    #[serde(default = "default_search_max_iterations")]
    pub search_max_iterations: u32,

    /// Pending search results kept per conversation.
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Lowest fit rating (0-5) a search result needs to be kept.
    #[serde(default = "default_search_min_fit")]
    pub search_min_fit: i64,
}

fn default_max_iterations() -> u32 {
    15
}
fn default_onboarding_max_iterations() -> u32 {
    10
}
fn default_search_max_iterations() -> u32 {
    40
}
fn default_search_max_results() -> usize {
    25
}
fn default_search_min_fit() -> i64 {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            onboarding_max_iterations: default_onboarding_max_iterations(),
            search_max_iterations: default_search_max_iterations(),
            search_max_results: default_search_max_results(),
            search_min_fit: default_search_min_fit(),
        }
    }
}

/// Keys for the web-search and job-board APIs the tools call.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adzuna_app_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adzuna_app_key: Option<String>,

    #[serde(default = "default_adzuna_country")]
    pub adzuna_country: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsearch_api_key: Option<String>,

    /// "jsearch" or "adzuna"; unset picks whichever has keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_job_provider: Option<String>,
}

fn default_adzuna_country() -> String {
    "us".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            adzuna_app_id: None,
            adzuna_app_key: None,
            adzuna_country: default_adzuna_country(),
            jsearch_api_key: None,
            default_job_provider: None,
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("adzuna_app_id", &self.adzuna_app_id)
            .field("adzuna_app_key", &redact(&self.adzuna_app_key))
            .field("adzuna_country", &self.adzuna_country)
            .field("jsearch_api_key", &redact(&self.jsearch_api_key))
            .field("default_job_provider", &self.default_job_provider)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    42617
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the profile and resume live. Defaults to `~/.shortlist/data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.shortlist/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// API keys only fill gaps left by the file; `SHORTLIST_PROVIDER` and
    /// `SHORTLIST_MODEL` always win.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if self.api_key.is_none() {
            self.api_key = first(&["SHORTLIST_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"]);
        }
        for (provider, var) in [("anthropic", "ANTHROPIC_API_KEY"), ("gemini", "GEMINI_API_KEY")] {
            if let Some(key) = first(&[var]) {
                let entry = self.providers.entry(provider.into()).or_default();
                if entry.api_key.is_none() {
                    entry.api_key = Some(key);
                }
            }
        }
        if let Some(provider) = first(&["SHORTLIST_PROVIDER"]) {
            self.default_provider = provider;
        }
        if let Some(model) = first(&["SHORTLIST_MODEL"]) {
            self.default_model = model;
        }

        let search = &mut self.search;
        for (slot, keys) in [
            (&mut search.tavily_api_key, &["TAVILY_API_KEY", "SEARCH_API_KEY"][..]),
            (&mut search.adzuna_app_id, &["ADZUNA_APP_ID"][..]),
            (&mut search.adzuna_app_key, &["ADZUNA_APP_KEY"][..]),
            (&mut search.jsearch_api_key, &["JSEARCH_API_KEY"][..]),
        ] {
            if slot.is_none() {
                *slot = first(keys);
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shortlist")
    }

    /// Directory holding the profile document and resume.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("data"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let agent = &self.agent;
        if agent.max_iterations == 0
            || agent.onboarding_max_iterations == 0
            || agent.search_max_iterations == 0
        {
            return Err(ConfigError::ValidationError(
                "iteration caps must be at least 1".into(),
            ));
        }

        if !(0..=5).contains(&agent.search_min_fit) {
            return Err(ConfigError::ValidationError(
                "agent.search_min_fit must be between 0 and 5".into(),
            ));
        }

        if let Some(provider) = &self.search.default_job_provider
            && !matches!(provider.as_str(), "jsearch" | "adzuna")
        {
            return Err(ConfigError::ValidationError(format!(
                "unknown job search provider '{provider}' (expected jsearch or adzuna)"
            )));
        }

        Ok(())
    }

    /// True when the default provider has a key, either its own or the
    /// top-level one.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            agent: AgentConfig::default(),
            search: SearchConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
