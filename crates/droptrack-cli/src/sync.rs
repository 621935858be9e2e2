//! The `sync` command: one aggregation cycle, optionally narrowed to a
//! single retailer.
//!
//! Fanout happens in the server process, which owns the subscriber
//! connections; a CLI-triggered cycle persists only, so it runs with a no-op
//! notifier. Connected dashboards pick the changes up on the server's next
//! scheduled cycle or by re-syncing over REST.

use std::path::PathBuf;

use clap::Args;

use droptrack_realtime::NoopNotifier;
use droptrack_scraper::{HttpRenderedFetcher, SourceClient};
use droptrack_sync::CycleOptions;

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Restrict the cycle to a single retailer (by registry id)
    #[arg(long)]
    pub source: Option<String>,

    /// Compute and log without persisting or notifying
    #[arg(long)]
    pub dry_run: bool,

    /// Override the inter-request pause, in seconds
    #[arg(long)]
    pub pause_secs: Option<u64>,

    /// Path to a retailer registry file (defaults to the configured one)
    #[arg(long)]
    pub retailers: Option<PathBuf>,
}

pub async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = droptrack_core::load_app_config()?;

    let registry_path = args.retailers.unwrap_or_else(|| config.retailers_path.clone());
    let retailers = droptrack_core::load_retailers(&registry_path)?.enabled();
    if retailers.is_empty() {
        println!("no enabled retailers in {}", registry_path.display());
        return Ok(());
    }

    let pool_config = droptrack_db::PoolConfig::from_app_config(&config);
    // A dry run never touches the store; a lazy pool lets it run with the
    // database down.
    let pool = if args.dry_run {
        droptrack_db::connect_pool_lazy(&config.database_url, pool_config)?
    } else {
        droptrack_db::connect_pool(&config.database_url, pool_config).await?
    };
    if !args.dry_run {
        droptrack_db::run_migrations(&pool).await?;
    }

    let render_client = SourceClient::new(
        config.fetch_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )?;
    let fetcher = HttpRenderedFetcher::new(render_client);

    let options = CycleOptions {
        dry_run: args.dry_run,
        pause_secs: args.pause_secs,
        source: args.source,
    };

    let outcome = droptrack_sync::run_cycle(
        &pool,
        &config,
        &retailers,
        &fetcher,
        &NoopNotifier,
        "cli",
        &options,
    )
    .await?;

    if args.dry_run {
        println!(
            "dry-run: {} records from {} sources (nothing persisted)",
            outcome.collected, outcome.sources
        );
    } else {
        println!(
            "synced {} records from {} sources ({} new, {} updated, {} failed)",
            outcome.collected,
            outcome.sources,
            outcome.inserted,
            outcome.updated,
            outcome.failed
        );
    }

    Ok(())
}
