//! Read-only inspection commands over the store.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ReleasesCommands {
    /// List stored releases, newest first
    List {
        /// Restrict to a specific retailer (by registry id)
        #[arg(long)]
        retailer: Option<String>,

        /// Restrict to a status (live, upcoming, released, delayed, cancelled)
        #[arg(long)]
        status: Option<String>,

        /// Maximum rows to print
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List recent sync runs, newest first
    List {
        /// Maximum rows to print
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

pub async fn run_releases(command: ReleasesCommands) -> anyhow::Result<()> {
    let pool = droptrack_db::connect_pool_from_env().await?;

    match command {
        ReleasesCommands::List {
            retailer,
            status,
            limit,
        } => {
            let rows = droptrack_db::list_releases(
                &pool,
                droptrack_db::ReleaseListFilters {
                    retailer_id: retailer.as_deref(),
                    status: status.as_deref(),
                    limit: Some(limit),
                },
            )
            .await?;

            if rows.is_empty() {
                println!("no releases found");
                return Ok(());
            }

            for row in rows {
                let price = row
                    .price
                    .map_or_else(|| "-".to_string(), |p| format!("{p} {}", row.currency));
                let date = row
                    .release_date
                    .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
                println!(
                    "{:<40} {:<10} {:<12} {:>14}  {}",
                    row.release_id,
                    row.status,
                    date,
                    price,
                    row.product_name.as_deref().unwrap_or("<unnamed>")
                );
            }
        }
    }

    Ok(())
}

pub async fn run_runs(command: RunsCommands) -> anyhow::Result<()> {
    let pool = droptrack_db::connect_pool_from_env().await?;

    match command {
        RunsCommands::List { limit } => {
            let rows = droptrack_db::list_sync_runs(&pool, limit).await?;

            if rows.is_empty() {
                println!("no sync runs recorded");
                return Ok(());
            }

            for row in rows {
                let completed = row
                    .completed_at
                    .map_or_else(|| "-".to_string(), |d| d.to_rfc3339());
                println!(
                    "{} {:<10} {:<10} records={:<6} completed={} {}",
                    row.public_id,
                    row.trigger_source,
                    row.status,
                    row.records_processed,
                    completed,
                    row.error_message.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
