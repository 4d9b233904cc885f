//! List the job-search results recorded for the current conversation.

use async_trait::async_trait;
use serde_json::{Value, json};
use shortlist_core::error::ToolError;
use shortlist_core::store::SearchResultStore;
use shortlist_core::tool::{Tool, ToolContext, opt_i64};
use std::sync::Arc;

pub struct ListSearchResultsTool {
    results: Arc<dyn SearchResultStore>,
}

impl ListSearchResultsTool {
    pub fn new(results: Arc<dyn SearchResultStore>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl Tool for ListSearchResultsTool {
    fn name(&self) -> &str {
        "list_search_results"
    }

    fn description(&self) -> &str {
        "List job search results from the current conversation, best fit first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "min_fit": { "type": "integer", "description": "Minimum fit rating 0-5" }
            }
        })
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let Some(conversation_id) = &ctx.conversation_id else {
            return Ok(json!({ "results": [], "total": 0 }));
        };
        let results = self
            .results
            .list(conversation_id, opt_i64(&arguments, "min_fit"))
            .await?;
        Ok(json!({ "total": results.len(), "results": results }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortlist_core::message::ConversationId;
    use shortlist_core::records::NewSearchResult;
    use shortlist_store::InMemorySearchResultStore;

    #[tokio::test]
    async fn lists_current_conversation_by_fit() {
        let store = Arc::new(InMemorySearchResultStore::new());
        let mine = ConversationId::from("conv-a");
        let other = ConversationId::from("conv-b");
        for (conv, company, fit) in [(&mine, "Acme", 3), (&mine, "Globex", 5), (&other, "Initech", 4)] {
            store
                .add(
                    conv,
                    NewSearchResult {
                        company: company.into(),
                        title: "Engineer".into(),
                        job_fit: fit,
                        ..NewSearchResult::default()
                    },
                )
                .await
                .unwrap();
        }

        let tool = ListSearchResultsTool::new(store);
        let ctx = ToolContext::for_conversation(mine);
        let all = tool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(all["total"], 2);
        assert_eq!(all["results"][0]["company"], "Globex");

        let top = tool.execute(json!({"min_fit": 4}), &ctx).await.unwrap();
        assert_eq!(top["total"], 1);
    }

    #[tokio::test]
    async fn no_conversation_means_no_results() {
        let tool = ListSearchResultsTool::new(Arc::new(InMemorySearchResultStore::new()));
        let result = tool.execute(json!({}), &ToolContext::default()).await.unwrap();
        assert_eq!(result["total"], 0);
    }
}
