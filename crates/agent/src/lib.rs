//! The agent core of Shortlist.
//!
//! A run follows one cycle:
//!
//! 1. **Build history**: the variant's system prompt plus the prior conversation
//! 2. **Stream** a model turn, emitting text as it arrives
//! 3. **If tool calls**: execute them in order, append results, go back to 2
//! 4. **If text only**: emit `done` with the full text
//!
//! The loop stops with an `error` event when the provider fails or the
//! iteration cap is reached. Four variants are built on it: the general
//! [`ChatAgent`], the [`OnboardingAgent`] interview, the single-shot
//! [`ResumeParser`] and the [`JobSearchAgent`] sub-agent.

pub mod accumulator;
pub mod chat;
pub mod job_search;
pub mod loop_runner;
pub mod onboarding;
pub mod prompts;
pub mod resume_parser;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use accumulator::{FinalizedCall, FragmentAccumulator, Turn};
pub use chat::ChatAgent;
pub use job_search::{
    AddSearchResultTool, JobSearchAgent, RunJobSearchTool, SearchOutcome, SearchRequest,
};
pub use loop_runner::{AgentLoop, AgentRun, FixedPrompt, MAX_ITERATIONS_MESSAGE, TurnPolicy};
pub use onboarding::{ONBOARDING_MARKER, OnboardingAgent};
pub use resume_parser::{ResumeParseError, ResumeParser};
