mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use droptrack_realtime::EventHub;
use droptrack_scraper::{HttpRenderedFetcher, RenderedFetcher, SourceClient};

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(droptrack_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = droptrack_db::PoolConfig::from_app_config(&config);
    let pool = droptrack_db::connect_pool(&config.database_url, pool_config).await?;
    droptrack_db::run_migrations(&pool).await?;

    let retailers = Arc::new(
        droptrack_core::load_retailers(&config.retailers_path)?
            .enabled(),
    );
    tracing::info!(
        count = retailers.len(),
        path = %config.retailers_path.display(),
        "loaded retailer registry"
    );

    let render_client = SourceClient::new(
        config.fetch_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )?;
    let fetcher: Arc<dyn RenderedFetcher> = Arc::new(HttpRenderedFetcher::new(render_client));

    let hub = EventHub::new();
    let state = AppState {
        pool,
        hub: hub.clone(),
        config: Arc::clone(&config),
        retailers,
        fetcher,
        cycle_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    let _scheduler = scheduler::build_scheduler(state.clone()).await?;

    let app = build_app(state).merge(droptrack_realtime::router(hub));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "droptrack server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
