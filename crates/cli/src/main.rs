//! Status Dashboard CLI
//!
//! A command-line tool for querying a running status dashboard: the
//! current snapshot, host metrics, individual services and alert history.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{history, status};

/// Status Dashboard CLI
#[derive(Parser)]
#[command(name = "statusctl")]
#[command(author, version, about = "CLI for the Status Dashboard", long_about = None)]
pub struct Cli {
    /// Dashboard URL (can also be set via STATUSCTL_API_URL env var)
    #[arg(long, env = "STATUSCTL_API_URL", default_value = "http://localhost:3000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll now and show the full snapshot
    Status,

    /// Show host metrics
    System,

    /// Probe a single configured service
    Service {
        /// Service name as configured on the dashboard
        name: String,
    },

    /// Show recent checks from the alert history
    History {
        /// Number of checks to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Show the dashboard's own health
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Status => status::show_status(&client, cli.format).await?,
        Commands::System => status::show_system(&client, cli.format).await?,
        Commands::Service { name } => status::show_service(&client, &name, cli.format).await?,
        Commands::History { limit } => history::show_history(&client, limit, cli.format).await?,
        Commands::Health => history::show_health(&client, cli.format).await?,
    }

    Ok(())
}
