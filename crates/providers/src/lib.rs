//! LLM provider implementations for Shortlist.
//!
//! All providers implement the `shortlist_core::Provider` trait and emit
//! normalized [`StreamChunk`](shortlist_core::StreamChunk)s. The router
//! selects the backend named in configuration.

pub mod anthropic;
mod http;
pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
