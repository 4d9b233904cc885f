//! `shortlist search`: one job search, outside of chat.

use super::{CmdResult, load_config, load_deps, render};
use shortlist_agent::{JobSearchAgent, SearchRequest};
use shortlist_core::message::ConversationId;
use shortlist_core::tool::ToolContext;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub async fn run(request: SearchRequest, conversation: Option<String>) -> CmdResult {
    let config = load_config()?;
    let deps = load_deps(&config)?;
    let agent = JobSearchAgent::new(deps, &config.agent)?.with_temperature(config.default_temperature);

    let conversation_id = conversation.map(ConversationId).unwrap_or_default();
    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let ctx = ToolContext {
        conversation_id: Some(conversation_id),
        events: Some(tx),
        cancel: cancel.clone(),
    };

    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            if render(&event, &mut stdout).is_err() {
                break;
            }
        }
    });

    let outcome = tokio::select! {
        outcome = agent.run(request, &ctx) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            return Err("Search cancelled".into());
        }
    };
    drop(ctx);
    let _ = printer.await;

    println!();
    println!("  {}", outcome.summary);
    Ok(())
}
