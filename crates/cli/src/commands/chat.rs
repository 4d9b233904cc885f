//! `shortlist chat`: interactive or single-message chat.

use super::{CmdResult, load_config, load_deps, prompt, record_turn, stdin_lines, stream_to_terminal};
use shortlist_agent::ChatAgent;
use shortlist_core::message::{ConversationId, Message};

pub async fn run(message: Option<String>, conversation: Option<String>) -> CmdResult {
    let config = load_config()?;
    let deps = load_deps(&config)?;
    let agent = ChatAgent::new(deps, &config.agent)?.with_temperature(config.default_temperature);
    let conversation_id = conversation.map(ConversationId).unwrap_or_default();

    if let Some(msg) = message {
        let run = agent
            .run(Some(conversation_id), vec![Message::user(msg)])
            .await;
        stream_to_terminal(run).await?;
        return Ok(());
    }

    println!();
    println!("  Shortlist: interactive chat");
    println!();
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.default_model);
    println!("  Tools:         {}", agent.tools().len());
    println!("  Conversation:  {conversation_id}");
    println!();
    println!("  Ctrl+C stops a reply. Type 'exit' to quit.");
    println!();

    let mut lines = stdin_lines();
    let mut history = Vec::new();

    prompt("You")?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt("You")?;
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        history.push(Message::user(line));
        print!("\n  Assistant > ");
        let run = agent
            .run(Some(conversation_id.clone()), history.clone())
            .await;
        let outcome = stream_to_terminal(run).await?;
        record_turn(&mut history, &outcome);

        println!();
        prompt("You")?;
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
