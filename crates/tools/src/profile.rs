//! Read and rewrite the user's markdown profile document.

use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::store::ProfileStore;
use shortlist_core::tool::{Tool, ToolContext, req_str};
use std::sync::Arc;
use tracing::info;

pub struct ReadUserProfileTool {
    profile: Arc<dyn ProfileStore>,
}

impl ReadUserProfileTool {
    pub fn new(profile: Arc<dyn ProfileStore>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Tool for ReadUserProfileTool {
    fn name(&self) -> &str {
        "read_user_profile"
    }

    fn description(&self) -> &str {
        "Read the user's profile document."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        Ok(json!({ "content": self.profile.read().await? }))
    }
}

pub struct UpdateUserProfileTool {
    profile: Arc<dyn ProfileStore>,
}

impl UpdateUserProfileTool {
    pub fn new(profile: Arc<dyn ProfileStore>) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl Tool for UpdateUserProfileTool {
    fn name(&self) -> &str {
        "update_user_profile"
    }

    fn description(&self) -> &str {
        "Update the user's profile document. Pass the full updated markdown, not a diff."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Full updated markdown profile content"
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let content = req_str(&arguments, "content")?;
        self.profile.write(content).await?;
        info!(chars = content.len(), "Profile document updated");
        Ok(json!({ "status": "updated", "content": self.profile.read().await? }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortlist_store::FileProfileStore;

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ProfileStore> = Arc::new(FileProfileStore::in_dir(dir.path()));
        let ctx = ToolContext::default();

        let updated = UpdateUserProfileTool::new(store.clone())
            .execute(json!({"content": "# Profile\n\nLikes Rust."}), &ctx)
            .await
            .unwrap();
        assert_eq!(updated["status"], "updated");

        let read = ReadUserProfileTool::new(store)
            .execute(json!({}), &ctx)
            .await
            .unwrap();
        assert!(read["content"].as_str().unwrap().contains("Likes Rust."));
    }

    #[tokio::test]
    async fn missing_document_reads_template() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ProfileStore> = Arc::new(FileProfileStore::in_dir(dir.path()));
        let read = ReadUserProfileTool::new(store)
            .execute(json!({}), &ToolContext::default())
            .await
            .unwrap();
        assert!(!read["content"].as_str().unwrap().is_empty());
    }
}
