//! The user profile: a markdown document with a small frontmatter block.
//!
//! ```text
//! ---
//! onboarded: false
//! ---
//! # User Profile
//! ...
//! ```
//!
//! Readers see only the body. Writers replace the body and keep the
//! frontmatter; frontmatter carried in the written text is merged in.

use async_trait::async_trait;
use shortlist_core::error::StoreError;
use shortlist_core::store::ProfileStore;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_PROFILE_TEMPLATE: &str = "---
onboarded: false
---
# User Profile

## Summary
_No summary yet. The AI assistant will fill this in as it learns about you._

## Education
- _Not yet provided_

## Work Experience
- _Not yet provided_

## Skills & Expertise
- _Not yet provided_

## Fields of Interest
- _Not yet provided_

## Salary Preferences
- _Not yet provided_

## Location Preferences
- _Not yet provided_

## Remote Work Preferences
- _Not yet provided_

## Job Search Goals
- _Not yet provided_

## Other Notes
- _None yet_
";

const ONBOARDED_KEY: &str = "onboarded";

/// Ordered `key: value` pairs from a frontmatter block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(Vec<(String, String)>);

impl Frontmatter {
    /// Splits `text` into frontmatter and body. Text without a leading
    /// `---` block has empty frontmatter and is all body.
    pub fn split(text: &str) -> (Self, &str) {
        let Some(rest) = text.strip_prefix("---\n") else {
            return (Self::default(), text);
        };
        let (block, body) = if let Some(body) = rest.strip_prefix("---\n") {
            ("", body)
        } else if let Some(end) = rest.find("\n---\n") {
            (&rest[..end], &rest[end + 5..])
        } else {
            return (Self::default(), text);
        };

        let pairs = block
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        (Self(pairs), body)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    /// Copies every pair of `other` over this one.
    pub fn merge(&mut self, other: Frontmatter) {
        for (k, v) in other.0 {
            self.set(&k, v);
        }
    }

    /// Renders the frontmatter followed by `body`.
    pub fn render(&self, body: &str) -> String {
        let mut out = String::from("---\n");
        for (k, v) in &self.0 {
            out.push_str(k);
            out.push_str(": ");
            out.push_str(v);
            out.push('\n');
        }
        out.push_str("---\n");
        out.push_str(body);
        out
    }
}

/// Profile document stored at `<data_dir>/user_profile.md`.
///
/// A mutex serializes read-modify-write cycles so concurrent runs never
/// interleave partial updates.
pub struct FileProfileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("user_profile.md"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<String, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(DEFAULT_PROFILE_TEMPLATE.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, text: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, text).await?;
        debug!(path = %self.path.display(), bytes = text.len(), "Profile saved");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn read(&self) -> Result<String, StoreError> {
        let text = self.load().await?;
        Ok(Frontmatter::split(&text).1.to_string())
    }

    async fn write(&self, content: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let existing = self.load().await?;
        let (mut meta, _) = Frontmatter::split(&existing);
        let (incoming, body) = Frontmatter::split(content);
        meta.merge(incoming);
        self.save(&meta.render(body)).await
    }

    async fn is_onboarded(&self) -> Result<bool, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(Frontmatter::split(&text).0.get_bool(ONBOARDED_KEY)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_onboarded(&self, onboarded: bool) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let existing = self.load().await?;
        let (mut meta, body) = Frontmatter::split(&existing);
        meta.set(ONBOARDED_KEY, onboarded.to_string());
        self.save(&meta.render(body)).await?;
        info!(onboarded, "Onboarding flag updated");
        Ok(())
    }
}
