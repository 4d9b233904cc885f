//! Storage backends for Shortlist.
//!
//! Jobs, search results and todos live in memory for the lifetime of the
//! process. The profile document and the resume are flat files under the
//! data directory so they survive restarts and stay human-editable.

pub mod in_memory;
pub mod profile;
pub mod resume;

pub use in_memory::{InMemoryJobStore, InMemorySearchResultStore, InMemoryTodoStore};
pub use profile::{DEFAULT_PROFILE_TEMPLATE, FileProfileStore, Frontmatter};
pub use resume::FileResumeStore;
