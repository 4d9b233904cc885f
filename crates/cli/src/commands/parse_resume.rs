//! `shortlist parse-resume`: store a resume and its structured form.

use super::{CmdResult, load_config, load_deps};
use shortlist_agent::ResumeParser;
use std::path::Path;

pub async fn run(file: &Path) -> CmdResult {
    let raw_text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Could not read {}: {e}", file.display()))?;

    let config = load_config()?;
    let deps = load_deps(&config)?;
    deps.resume.save_raw_text(&raw_text).await?;

    eprint!("  Parsing...");
    let parser = ResumeParser::new(deps.provider.clone(), deps.model.clone(), deps.resume.clone());
    let parsed = parser.parse(&raw_text).await;
    eprint!("\r           \r");

    println!("{}", serde_json::to_string_pretty(&parsed?)?);
    Ok(())
}
