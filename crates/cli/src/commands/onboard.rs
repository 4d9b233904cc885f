//! `shortlist onboard`: first-time setup and the profile interview.

use super::{CmdResult, load_config, load_deps, prompt, record_turn, stdin_lines, stream_to_terminal};
use shortlist_agent::OnboardingAgent;
use shortlist_config::AppConfig;
use shortlist_core::message::Message;

/// Opening line sent on the user's behalf so the interviewer speaks first.
const KICKOFF: &str = "Hi! I'm ready to set up my profile.";

pub async fn run(restart: bool) -> CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Shortlist: first-time setup");
    println!("===========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    }
    if !config_path.exists() {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
        println!("  Add your API key there (or set OPENROUTER_API_KEY) and re-run onboard.\n");
    }

    let config = load_config()?;
    let data_dir = config.data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        println!("  Created data directory: {}", data_dir.display());
    }

    let deps = load_deps(&config)?;
    if deps.profile.is_onboarded().await? && !restart {
        println!("  Your profile is already set up. Use --restart to interview again.");
        return Ok(());
    }

    let agent = OnboardingAgent::new(&deps, &config.agent)?.with_temperature(config.default_temperature);
    println!("\n  Let's build your job-search profile. Type 'exit' to stop at any time.\n");

    let mut lines = stdin_lines();
    let mut history = vec![Message::user(KICKOFF)];

    loop {
        print!("  Interviewer > ");
        let outcome = stream_to_terminal(agent.run(history.clone())).await?;
        record_turn(&mut history, &outcome);
        if outcome.onboarding_complete {
            println!("  Saved to {}", data_dir.join("user_profile.md").display());
            break;
        }

        println!();
        prompt("You")?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line == "exit" || line == "quit" {
            println!("\n  Stopped. Run `shortlist onboard` to continue later.");
            break;
        }
        history.push(Message::user(line));
    }

    Ok(())
}
