//! `shortlist config`: configuration management commands.

use super::CmdResult;
use shortlist_config::AppConfig;

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

pub async fn init() -> CmdResult {
    let path = config_path();
    if path.exists() {
        println!("Config already exists at: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Created {}", path.display());
    Ok(())
}

pub async fn validate() -> CmdResult {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            if !config.has_api_key() {
                println!("   Warning: no API key set (set OPENROUTER_API_KEY or OPENAI_API_KEY)");
            }
            if config.search.tavily_api_key.is_none() {
                println!("   Warning: web_search is disabled (set TAVILY_API_KEY)");
            }
            if config.search.adzuna_app_id.is_none() && config.search.jsearch_api_key.is_none() {
                println!("   Warning: job_search is disabled (set ADZUNA_APP_ID/ADZUNA_APP_KEY or JSEARCH_API_KEY)");
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
            println!("   Data:      {}", config.data_dir().display());
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> CmdResult {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{config:#?}");
    Ok(())
}

pub async fn path() -> CmdResult {
    println!("{}", config_path().display());
    Ok(())
}
