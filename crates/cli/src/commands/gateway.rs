//! `shortlist gateway`: start the HTTP/SSE server.

use super::{CmdResult, load_config};

pub async fn run(port_override: Option<u16>) -> CmdResult {
    let mut config = load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Shortlist gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);

    shortlist_gateway::start(config).await?;

    Ok(())
}
