//! Keygate - delegated authorization server for third-party apps
//!
//! Main entry point for the Keygate CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod client;
mod commands;

use commands::{clients, config, scopes, start, status, token};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keygate - delegated authorization server for third-party apps
#[derive(Parser)]
#[command(name = "keygate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "KEYGATE_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the Keygate server
    Start(start::StartArgs),

    /// Show server status
    Status(status::StatusArgs),

    /// Register and manage third-party clients
    Clients(clients::ClientsArgs),

    /// Inspect or revoke issued tokens
    Token(token::TokenArgs),

    /// List the scopes clients can be granted
    Scopes(scopes::ScopesArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "keygate=debug,keygate_oauth=debug,keygate_server=debug,keygate_config=debug,info"
    } else {
        "keygate=info,keygate_oauth=info,keygate_server=info,warn"
    };

    let log_dir = keygate_config::log_dir().unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "keygate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "keygate=trace,keygate_oauth=debug,keygate_server=debug,keygate_config=debug,info",
                )),
        )
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Clients(args) => clients::run(args, &ctx).await,
        Commands::Token(args) => token::run(args, &ctx).await,
        Commands::Scopes(args) => scopes::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
