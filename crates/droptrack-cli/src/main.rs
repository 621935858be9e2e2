mod query;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "droptrack")]
#[command(about = "Sneaker release aggregation command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one aggregation cycle across configured retailer sources
    Sync(sync::SyncArgs),
    /// Inspect stored releases
    Releases {
        #[command(subcommand)]
        command: query::ReleasesCommands,
    },
    /// Inspect past sync runs
    Runs {
        #[command(subcommand)]
        command: query::RunsCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => sync::run_sync(args).await,
        Commands::Releases { command } => query::run_releases(command).await,
        Commands::Runs { command } => query::run_runs(command).await,
    }
}
