mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sheetsync",
    about = "Mirror every MongoDB collection into a tab of one Google spreadsheet",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML tuning file (retry, reconnect, debounce, endpoints)
    #[arg(long, global = true, env = "SHEETSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Serve /health and /status on this port
    #[arg(long, global = true, env = "PORT")]
    port: Option<u16>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every collection, then keep tabs current from change streams (default)
    Run,

    /// Export every collection once and exit
    Export,

    /// List the collections that would be mirrored
    Collections,
}

fn main() {
    // Variables already in the environment win over `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Some(Commands::Collections) => tracing::Level::WARN,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd::run::run(config, cli.port),
        Commands::Export => cmd::export::run(config, cli.json),
        Commands::Collections => cmd::collections::run(cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
