//! Read the user's uploaded resume.

use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::store::ResumeStore;
use shortlist_core::tool::{Tool, ToolContext};
use std::sync::Arc;

pub struct ReadResumeTool {
    resume: Arc<dyn ResumeStore>,
}

impl ReadResumeTool {
    pub fn new(resume: Arc<dyn ResumeStore>) -> Self {
        Self { resume }
    }
}

#[async_trait]
impl Tool for ReadResumeTool {
    fn name(&self) -> &str {
        "read_resume"
    }

    fn description(&self) -> &str {
        "Read the user's uploaded resume, including its structured form when it has been parsed."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let Some(content) = self.resume.raw_text().await? else {
            return Ok(json!({
                "content": null,
                "message": "No resume uploaded yet. Ask the user to upload one."
            }));
        };

        let mut result = json!({ "content": content });
        if let Some(parsed) = self.resume.parsed().await? {
            result["parsed"] = parsed;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortlist_store::FileResumeStore;

    #[tokio::test]
    async fn no_resume() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadResumeTool::new(Arc::new(FileResumeStore::new(dir.path())));
        let result = tool.execute(json!({}), &ToolContext::default()).await.unwrap();
        assert!(result["content"].is_null());
        assert!(result["message"].as_str().unwrap().contains("No resume"));
    }

    #[tokio::test]
    async fn raw_and_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileResumeStore::new(dir.path()));
        store.save_raw_text("Jane Doe\nRust engineer").await.unwrap();

        let tool = ReadResumeTool::new(store.clone());
        let result = tool.execute(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(result["content"], "Jane Doe\nRust engineer");
        assert!(result.get("parsed").is_none());

        store.save_parsed(&json!({"name": "Jane Doe"})).await.unwrap();
        let result = tool.execute(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(result["parsed"]["name"], "Jane Doe");
    }
}
