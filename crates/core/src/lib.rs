//! # Shortlist Core
//!
//! Domain types and traits for the Shortlist job-search assistant. This crate
//! defines the model the other crates implement against:
//! - [`provider::Provider`] for model backends and the normalized stream chunk
//! - [`tool::Tool`] and the ordered [`tool::ToolRegistry`]
//! - [`event::AgentEvent`], the lifecycle events of an agent run
//! - storage traits for jobs, search results, todos, the profile and the resume

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod records;
pub mod store;
pub mod tool;

pub use error::{Error, ProviderError, Result, StoreError, ToolError};
pub use event::AgentEvent;
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{
    ChunkStream, Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallDelta,
    ToolDefinition, Usage,
};
pub use records::{
    ApplicationTodo, Job, JobDetails, JobFilter, JobUpdate, NewJob, NewSearchResult, NewTodo,
    SearchResult, TodoCategory,
};
pub use store::{JobStore, ProfileStore, ResumeStore, SearchResultStore, TodoStore};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry};
