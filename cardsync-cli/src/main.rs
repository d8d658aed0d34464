//! Cardsync CLI - sync open pull requests and issues into a GitHub project

mod commands;

use std::path::PathBuf;

use anyhow::Context;
use cardsync_core::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sync open pull requests and issues from many repositories into one project board
#[derive(Parser, Debug)]
#[command(name = "cardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file name to load
    #[arg(short, long, global = true, default_value = "config.yml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// GraphQL endpoint (overrides config and env)
    #[arg(long, global = true, env = "CARDSYNC_API_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync all configured repositories into the project (default)
    Sync,

    /// List the project's fields and single-select options
    Fields,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let command = cli.command.unwrap_or(Commands::Sync);
    if let Commands::Version = command {
        println!("cardsync {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load_with_overrides(&cli.config, cli.endpoint.clone())
        .with_context(|| format!("failed to load config: {}", cli.config.display()))?;

    tracing::debug!(
        project = %config.project,
        repositories = config.repositories.len(),
        endpoint = %config.api.endpoint,
        "Configuration loaded"
    );

    let gateway = commands::connect(&config).await?;

    match command {
        Commands::Sync => commands::sync::execute(&gateway, &config).await,
        Commands::Fields => commands::fields::execute(&gateway, &config).await,
        Commands::Version => Ok(()),
    }
}
