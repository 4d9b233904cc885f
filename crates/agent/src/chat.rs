//! The general chat agent: every tool, plus delegation to the job-search
//! sub-agent.

use crate::job_search::{JobSearchAgent, RunJobSearchTool};
use crate::loop_runner::{AgentLoop, AgentRun, FixedPrompt};
use crate::prompts::{chat_system_prompt, resume_status};
use shortlist_config::AgentConfig;
use shortlist_core::error::ToolError;
use shortlist_core::message::{ConversationId, Message};
use shortlist_core::store::{ProfileStore, ResumeStore};
use shortlist_core::tool::ToolRegistry;
use shortlist_tools::{ToolDeps, default_registry};
use std::sync::Arc;
use tracing::warn;

pub struct ChatAgent {
    deps: ToolDeps,
    tools: ToolRegistry,
    max_iterations: u32,
    temperature: f32,
}

impl ChatAgent {
    pub fn new(deps: ToolDeps, config: &AgentConfig) -> Result<Self, ToolError> {
        let mut tools = default_registry(&deps)?;
        let search = JobSearchAgent::new(deps.clone(), config)?;
        tools.register(Arc::new(RunJobSearchTool::new(search)));
        Ok(Self::with_tools(deps, tools, config))
    }

    /// Uses `tools` instead of the built-in catalog.
    pub fn with_tools(deps: ToolDeps, tools: ToolRegistry, config: &AgentConfig) -> Self {
        Self {
            deps,
            tools,
            max_iterations: config.max_iterations,
            temperature: 0.7,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Starts a run. The profile and resume are read once, up front.
    pub async fn run(
        &self,
        conversation_id: Option<ConversationId>,
        history: Vec<Message>,
    ) -> AgentRun {
        let prompt = system_prompt(self.deps.profile.as_ref(), self.deps.resume.as_ref()).await;
        let mut agent = AgentLoop::new(
            self.deps.provider.clone(),
            self.deps.model.clone(),
            self.tools.clone(),
            Arc::new(FixedPrompt(prompt)),
        )
        .with_max_iterations(self.max_iterations)
        .with_temperature(self.temperature);
        if let Some(id) = conversation_id {
            agent = agent.with_conversation(id);
        }
        agent.run(history)
    }
}

async fn system_prompt(profile: &dyn ProfileStore, resume: &dyn ResumeStore) -> String {
    let profile = profile.read().await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not read profile for chat prompt");
        String::new()
    });
    let resume = resume.raw_text().await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not read resume for chat prompt");
        None
    });
    chat_system_prompt(&profile, &resume_status(resume.as_deref()))
}
