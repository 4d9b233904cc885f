pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod gateway;
pub mod onboard;
pub mod parse_resume;
pub mod search;

use shortlist_agent::AgentRun;
use shortlist_config::AppConfig;
use shortlist_core::event::AgentEvent;
use shortlist_core::message::Message;
use shortlist_tools::ToolDeps;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Loads config and fails early, with setup hints, when no key is set.
pub(crate) fn load_config() -> CmdResult<AppConfig> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...   (recommended)");
        eprintln!("    OPENAI_API_KEY=sk-...             (for OpenAI direct)");
        eprintln!("    ANTHROPIC_API_KEY=sk-ant-...      (for Anthropic)");
        eprintln!("    GEMINI_API_KEY=...                (for Gemini)");
        eprintln!("    SHORTLIST_API_KEY=...             (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    Ok(config)
}

pub(crate) fn load_deps(config: &AppConfig) -> CmdResult<ToolDeps> {
    let deps = shortlist_gateway::deps_from_config(config)?;
    debug!(
        provider = deps.provider.name(),
        model = %deps.model,
        data_dir = %config.data_dir().display(),
        "Dependencies ready"
    );
    Ok(deps)
}

pub(crate) fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

pub(crate) fn prompt(label: &str) -> std::io::Result<()> {
    print!("  {label} > ");
    std::io::stdout().flush()
}

/// Writes one event for a terminal reader. Text streams inline; tool
/// activity goes on its own lines.
pub(crate) fn render(event: &AgentEvent, out: &mut impl Write) -> std::io::Result<()> {
    match event {
        AgentEvent::TextDelta { content } => write!(out, "{content}")?,
        AgentEvent::ToolStart { name, .. } => writeln!(out, "\n    [tool] {name} ...")?,
        AgentEvent::ToolResult { name, .. } => writeln!(out, "    [tool] {name} done")?,
        AgentEvent::ToolError { name, error, .. } => {
            writeln!(out, "    [tool] {name} failed: {error}")?
        }
        AgentEvent::SearchStarted { query } => writeln!(out, "    [search] {query}")?,
        AgentEvent::SearchResultAdded(result) => writeln!(
            out,
            "    [match {}/5] {} at {}",
            result.job_fit, result.title, result.company
        )?,
        AgentEvent::SearchCompleted { results_added } => {
            writeln!(out, "    [search] {results_added} result(s) recorded")?
        }
        AgentEvent::OnboardingComplete {} => writeln!(out, "\n\n  Profile complete.")?,
        AgentEvent::Error { message } => writeln!(out, "\n  [Error] {message}")?,
        AgentEvent::Done { .. } => writeln!(out)?,
        AgentEvent::SearchProgress { .. } => {}
    }
    out.flush()
}

/// How a streamed turn ended.
pub(crate) struct TurnOutcome {
    /// Text to keep in the history, possibly partial.
    pub text: String,
    pub onboarding_complete: bool,
}

/// Streams `run` to stdout. Ctrl+C cancels the turn and keeps the text
/// shown so far.
pub(crate) async fn stream_to_terminal(mut run: AgentRun) -> CmdResult<TurnOutcome> {
    let mut stdout = std::io::stdout();
    let mut outcome = TurnOutcome {
        text: String::new(),
        onboarding_complete: false,
    };

    loop {
        let event = tokio::select! {
            event = run.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                run.cancel();
                writeln!(stdout, "\n  [cancelled]")?;
                None
            }
        };
        let Some(event) = event else { break };
        render(&event, &mut stdout)?;
        match event {
            AgentEvent::Done { content } => outcome.text = content,
            AgentEvent::OnboardingComplete {} => outcome.onboarding_complete = true,
            _ => {}
        }
    }

    if outcome.text.is_empty() {
        outcome.text = run.partial_text().to_string();
    }
    Ok(outcome)
}

/// Appends a finished turn to `history`.
pub(crate) fn record_turn(history: &mut Vec<Message>, outcome: &TurnOutcome) {
    if !outcome.text.is_empty() {
        history.push(Message::assistant(outcome.text.clone()));
    }
}
