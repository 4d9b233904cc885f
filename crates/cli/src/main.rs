//! Shortlist CLI: the main entry point.
//!
//! Commands:
//! - `chat`          Talk to the job-tracking assistant
//! - `onboard`       Create config and run the profile interview
//! - `parse-resume`  Turn a plain-text resume into structured JSON
//! - `search`        Run one background job search
//! - `gateway`       Start the HTTP/SSE server
//! - `config`        Inspect or create the configuration file
//! - `doctor`        Diagnose setup problems

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "shortlist",
    about = "Shortlist: an AI assistant for tracking and finding job applications",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing conversation (search results hang off it)
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Create configuration and run the onboarding interview
    Onboard {
        /// Interview again even if onboarding already finished
        #[arg(long)]
        restart: bool,
    },

    /// Parse a plain-text resume and store the result
    ParseResume {
        /// Path to the resume text
        file: PathBuf,
    },

    /// Search job boards for roles that fit your profile
    Search {
        /// What to look for, e.g. "senior rust engineer"
        query: String,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        remote_only: bool,

        #[arg(long)]
        salary_min: Option<i64>,

        #[arg(long)]
        salary_max: Option<i64>,

        /// Conversation the results are recorded under
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose setup problems
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config file
    Init,
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            conversation,
        } => commands::chat::run(message, conversation).await?,
        Commands::Onboard { restart } => commands::onboard::run(restart).await?,
        Commands::ParseResume { file } => commands::parse_resume::run(&file).await?,
        Commands::Search {
            query,
            location,
            remote_only,
            salary_min,
            salary_max,
            conversation,
        } => {
            let request = shortlist_agent::SearchRequest {
                query,
                location,
                remote_only,
                salary_min,
                salary_max,
            };
            commands::search::run(request, conversation).await?
        }
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Config { action } => match action {
            ConfigAction::Init => commands::config_cmd::init().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
