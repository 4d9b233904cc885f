//! The onboarding interview.
//!
//! A restricted agent that fills in the profile document. The profile is
//! re-read before every turn so the model sees its own updates. When the
//! model writes [`ONBOARDING_MARKER`] the profile is flagged as onboarded and
//! the run ends with `onboarding_complete` followed by `done`.

use crate::loop_runner::{AgentLoop, AgentRun, TurnPolicy};
use crate::prompts::onboarding_system_prompt;
use async_trait::async_trait;
use shortlist_config::AgentConfig;
use shortlist_core::error::ToolError;
use shortlist_core::message::Message;
use shortlist_core::store::ProfileStore;
use shortlist_tools::{ToolDeps, default_registry};
use std::sync::Arc;
use tracing::{info, warn};

pub const ONBOARDING_MARKER: &str = "[ONBOARDING_COMPLETE]";

/// The only tools the interview may call.
pub const ONBOARDING_TOOLS: &[&str] = &["read_user_profile", "update_user_profile"];

struct OnboardingPolicy {
    profile: Arc<dyn ProfileStore>,
}

#[async_trait]
impl TurnPolicy for OnboardingPolicy {
    async fn system_prompt(&self) -> String {
        let profile = self.profile.read().await.unwrap_or_else(|e| {
            warn!(error = %e, "Could not read profile for onboarding prompt");
            String::new()
        });
        onboarding_system_prompt(&profile)
    }

    fn completion_marker(&self) -> Option<&str> {
        Some(ONBOARDING_MARKER)
    }

    async fn on_marker(&self) {
        match self.profile.set_onboarded(true).await {
            Ok(()) => info!("Onboarding complete"),
            Err(e) => warn!(error = %e, "Could not mark profile as onboarded"),
        }
    }
}

pub struct OnboardingAgent {
    agent: AgentLoop,
}

impl OnboardingAgent {
    pub fn new(deps: &ToolDeps, config: &AgentConfig) -> Result<Self, ToolError> {
        let tools = default_registry(deps)?.subset(ONBOARDING_TOOLS);
        let policy = OnboardingPolicy {
            profile: deps.profile.clone(),
        };
        let agent = AgentLoop::new(deps.provider.clone(), deps.model.clone(), tools, Arc::new(policy))
            .with_max_iterations(config.onboarding_max_iterations);
        Ok(Self { agent })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.agent = self.agent.with_temperature(temperature);
        self
    }

    pub fn run(&self, history: Vec<Message>) -> AgentRun {
        self.agent.run(history)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.agent.tools().names()
    }
}
