//! `shortlist doctor`: diagnose setup problems.

use super::CmdResult;
use shortlist_config::AppConfig;

pub async fn run() -> CmdResult {
    println!("Shortlist doctor");
    println!("================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [!!] No config file. Run `shortlist onboard`");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  [ok] Config valid");

            if config.has_api_key() {
                println!("  [ok] API key configured");
            } else {
                println!("  [!!] No API key configured. Add api_key to config.toml");
                issues += 1;
            }

            let data_dir = config.data_dir();
            if data_dir.exists() {
                println!("  [ok] Data directory exists");
            } else {
                println!("  [!!] No data directory. Run `shortlist onboard`");
                issues += 1;
            }

            if let Ok(deps) = shortlist_gateway::deps_from_config(&config) {
                match deps.profile.is_onboarded().await {
                    Ok(true) => println!("  [ok] Profile onboarded"),
                    Ok(false) => println!("  [--] Profile not onboarded yet"),
                    Err(e) => {
                        println!("  [!!] Profile unreadable: {e}");
                        issues += 1;
                    }
                }
                match deps.provider.health_check().await {
                    Ok(true) => println!("  [ok] Provider {} reachable", deps.provider.name()),
                    Ok(false) | Err(_) => {
                        println!("  [!!] Provider {} unreachable", deps.provider.name());
                        issues += 1;
                    }
                }
            }
        }
        Err(e) => {
            println!("  [!!] Config invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
