//! Provider router: builds backends from configuration and hands out the
//! one a caller asked for.

use crate::anthropic::AnthropicProvider;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use shortlist_config::AppConfig;
use shortlist_core::error::ProviderError;
use shortlist_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
    default_model: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
            default_model: default_model.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Resolves `"provider/model"` when the prefix names a registered
    /// provider, otherwise the default provider with the string as the
    /// model. OpenRouter model ids like `anthropic/claude-sonnet-4` only
    /// split when `anthropic` itself is registered.
    pub fn resolve(&self, model: &str) -> Option<(Arc<dyn Provider>, String)> {
        if let Some((prefix, rest)) = model.split_once('/')
            && prefix != self.default_provider
            && let Some(provider) = self.get(prefix)
        {
            return Some((provider, rest.to_string()));
        }
        self.default_provider().map(|p| (p, model.to_string()))
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn build_one(
    name: &str,
    api_key: &str,
    api_url: Option<&str>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider: Arc<dyn Provider> = match name {
        "anthropic" => {
            let mut p = AnthropicProvider::new(api_key)?;
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "ollama" => Arc::new(OllamaProvider::new(
            api_url.unwrap_or(crate::ollama::DEFAULT_OLLAMA_URL),
        )?),
        _ => {
            let base_url = match api_url {
                Some(url) => url.to_string(),
                None => default_base_url(name).ok_or_else(|| {
                    ProviderError::NotConfigured(format!(
                        "provider '{name}' needs an api_url in config"
                    ))
                })?,
            };
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)?)
        }
    };
    Ok(provider)
}

/// Build providers from configuration. The default provider is always
/// registered, even when it has no `[providers.*]` table.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let mut router = ProviderRouter::new(&config.default_provider, &config.default_model);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();
        let provider = build_one(name, &api_key, provider_config.api_url.as_deref())?;
        debug!(provider = %name, "Registered provider");
        router.register(name.clone(), provider);
    }

    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let provider = build_one(&config.default_provider, &api_key, None)?;
        router.register(config.default_provider.clone(), provider);
    }

    if let Some(model) = config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
    {
        router.default_model = model;
    }

    Ok(router)
}

/// Base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "gemini" => "https://generativelanguage.googleapis.com/v1beta/openai",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "lmstudio" => "http://localhost:1234/v1",
        "vllm" => "http://localhost:8000/v1",
        _ => return None,
    };
    Some(url.to_string())
}
