//! Resume storage: the raw extracted text and its parsed JSON form, kept as
//! `resume.txt` and `resume.json` in the data directory.

use async_trait::async_trait;
use shortlist_core::error::StoreError;
use shortlist_core::store::ResumeStore;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileResumeStore {
    dir: PathBuf,
}

impl FileResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn text_path(&self) -> PathBuf {
        self.dir.join("resume.txt")
    }

    fn parsed_path(&self) -> PathBuf {
        self.dir.join("resume.json")
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: PathBuf, contents: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, contents).await?;
        debug!(path = %path.display(), "Resume file written");
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for FileResumeStore {
    async fn raw_text(&self) -> Result<Option<String>, StoreError> {
        Ok(Self::read_optional(&self.text_path())
            .await?
            .filter(|t| !t.trim().is_empty()))
    }

    async fn save_raw_text(&self, text: &str) -> Result<(), StoreError> {
        self.write(self.text_path(), text).await
    }

    async fn parsed(&self) -> Result<Option<serde_json::Value>, StoreError> {
        let Some(raw) = Self::read_optional(&self.parsed_path()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed(format!("resume.json: {e}")))
    }

    async fn save_parsed(&self, parsed: &serde_json::Value) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(parsed)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        self.write(self.parsed_path(), &text).await
    }
}
