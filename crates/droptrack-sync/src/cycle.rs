//! Cycle orchestration.
//!
//! A cycle reads the previously known state once at its start and writes
//! once at its end. Concurrent cycles are not supported: the invoking
//! scheduler or CLI must serialize them, since overlapping cycles would race
//! on the same natural keys.

use std::collections::HashMap;

use sqlx::PgPool;

use droptrack_core::{AppConfig, Release, RetailerConfig};
use droptrack_db::WriteOutcome;
use droptrack_realtime::{Notifier, ReleaseEvent};
use droptrack_scraper::{collect_releases, merge_releases, RenderedFetcher, SourceClient};

/// Per-invocation knobs. None of these affect the normalization contract.
#[derive(Debug, Default, Clone)]
pub struct CycleOptions {
    /// Compute and log without persisting or notifying.
    pub dry_run: bool,
    /// Override the configured inter-request pause.
    pub pause_secs: Option<u64>,
    /// Restrict the cycle to a single retailer id.
    pub source: Option<String>,
}

/// What one cycle did, for logs and the run record.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleOutcome {
    pub sources: usize,
    pub collected: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Runs one full aggregation cycle.
///
/// Per-source and per-item failures are absorbed downstream and surface here
/// only as counts; the error path of this function is reserved for shared
/// infrastructure — an unknown `--source` filter, an unbuildable HTTP
/// client, or a store that rejects the whole batch.
///
/// # Errors
///
/// Returns an error when the source filter matches nothing, the HTTP client
/// cannot be constructed, run bookkeeping fails, or every item of a
/// non-empty batch fails to persist (store-level failure).
pub async fn run_cycle(
    pool: &PgPool,
    config: &AppConfig,
    retailers: &[RetailerConfig],
    fetcher: &dyn RenderedFetcher,
    notifier: &dyn Notifier,
    trigger_source: &str,
    options: &CycleOptions,
) -> anyhow::Result<CycleOutcome> {
    let selected = select_retailers(retailers, options.source.as_deref())?;
    if selected.is_empty() {
        tracing::info!("no enabled retailers configured; skipping cycle");
        return Ok(CycleOutcome::default());
    }

    let client = SourceClient::new(
        config.fetch_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )?;
    let pause_secs = options.pause_secs.unwrap_or(config.pause_secs);

    if options.dry_run {
        return run_dry_cycle(&client, fetcher, &selected, config, pause_secs).await;
    }

    let run = droptrack_db::create_sync_run(pool, trigger_source).await?;
    droptrack_db::start_sync_run(pool, run.id).await?;

    let outcome = match persist_cycle(
        pool, &client, fetcher, notifier, &selected, config, pause_secs, run.id,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            fail_run_best_effort(pool, run.id, &format!("{e:#}")).await;
            return Err(e);
        }
    };

    let records = i32::try_from(outcome.collected).unwrap_or(i32::MAX);
    if let Err(e) = droptrack_db::complete_sync_run(pool, run.id, records).await {
        fail_run_best_effort(pool, run.id, &format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(
        run = %run.public_id,
        sources = outcome.sources,
        collected = outcome.collected,
        inserted = outcome.inserted,
        updated = outcome.updated,
        failed = outcome.failed,
        "sync cycle complete"
    );
    Ok(outcome)
}

/// The persisting body of a cycle, separated so any failure inside it marks
/// the run failed exactly once.
#[allow(clippy::too_many_arguments)]
async fn persist_cycle(
    pool: &PgPool,
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    notifier: &dyn Notifier,
    selected: &[RetailerConfig],
    config: &AppConfig,
    pause_secs: u64,
    run_id: i64,
) -> anyhow::Result<CycleOutcome> {
    // Known state is read once here and written once below; nothing else
    // touches the store mid-cycle.
    let known: Vec<Release> = droptrack_db::list_all_releases(pool)
        .await?
        .into_iter()
        .map(droptrack_db::ReleaseRow::into_release)
        .collect();

    let incoming = collect_releases(
        client,
        fetcher,
        selected,
        config.max_concurrent_sources,
        pause_secs,
    )
    .await;

    record_source_outcomes(pool, run_id, selected, &incoming).await;

    let merged = merge_releases(&known, incoming.clone());

    let results = droptrack_db::upsert_releases(pool, &incoming).await;
    let failed = results
        .iter()
        .filter(|r| matches!(r.outcome, WriteOutcome::Failed(_)))
        .count();
    if !results.is_empty() && failed == results.len() {
        anyhow::bail!("all {failed} release upserts failed; store unreachable or schema mismatch");
    }

    let by_id: HashMap<&str, &Release> = incoming.iter().map(|r| (r.id.as_str(), r)).collect();
    let inserted: Vec<Release> = results
        .iter()
        .filter(|r| r.outcome == WriteOutcome::Inserted)
        .filter_map(|r| by_id.get(r.release_id.as_str()).map(|&rel| rel.clone()))
        .collect();

    let outcome = CycleOutcome {
        sources: selected.len(),
        collected: incoming.len(),
        inserted: inserted.len(),
        updated: results
            .iter()
            .filter(|r| r.outcome == WriteOutcome::Updated)
            .count(),
        failed,
    };

    publish_cycle_events(notifier, inserted, merged);

    Ok(outcome)
}

/// Fetches and normalizes without touching the store or the notifier.
async fn run_dry_cycle(
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    selected: &[RetailerConfig],
    config: &AppConfig,
    pause_secs: u64,
) -> anyhow::Result<CycleOutcome> {
    let incoming = collect_releases(
        client,
        fetcher,
        selected,
        config.max_concurrent_sources,
        pause_secs,
    )
    .await;

    for release in &incoming {
        tracing::info!(
            id = %release.id,
            name = release.product_name.as_deref().unwrap_or("<unnamed>"),
            status = %release.status,
            price = ?release.price,
            "dry-run: would upsert"
        );
    }
    tracing::info!(
        sources = selected.len(),
        collected = incoming.len(),
        "dry-run complete; nothing persisted, nothing broadcast"
    );

    Ok(CycleOutcome {
        sources: selected.len(),
        collected: incoming.len(),
        ..CycleOutcome::default()
    })
}

/// Publishes this cycle's change events: one `release:new` per inserted
/// record, then the full-list update. Fire-and-forget.
fn publish_cycle_events(notifier: &dyn Notifier, inserted: Vec<Release>, merged: Vec<Release>) {
    for release in inserted {
        notifier.publish(ReleaseEvent::New { release });
    }
    notifier.publish(ReleaseEvent::ListUpdated { releases: merged });
}

/// Applies the optional `--source` filter over the enabled retailers.
fn select_retailers(
    retailers: &[RetailerConfig],
    source: Option<&str>,
) -> anyhow::Result<Vec<RetailerConfig>> {
    match source {
        None => Ok(retailers.iter().filter(|r| r.enabled).cloned().collect()),
        Some(id) => {
            let retailer = retailers
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| anyhow::anyhow!("retailer '{id}' not found in the registry"))?;
            if !retailer.enabled {
                anyhow::bail!("retailer '{id}' is disabled in the registry");
            }
            Ok(vec![retailer.clone()])
        }
    }
}

/// Records per-source record counts for the run, best-effort.
///
/// Fetch failures are absorbed inside the adapters, so a failed source shows
/// up here as an empty batch; the distinction lives in the warn logs.
async fn record_source_outcomes(
    pool: &PgPool,
    run_id: i64,
    selected: &[RetailerConfig],
    incoming: &[Release],
) {
    let mut counts: HashMap<&str, i32> = HashMap::new();
    for release in incoming {
        *counts.entry(release.retailer_id.as_str()).or_default() += 1;
    }

    for retailer in selected {
        let records = counts.get(retailer.id.as_str()).copied().unwrap_or(0);
        let status = if records > 0 { "completed" } else { "empty" };
        if let Err(e) = droptrack_db::upsert_sync_run_source(
            pool,
            run_id,
            &retailer.id,
            status,
            records,
            None,
        )
        .await
        {
            tracing::warn!(
                source = %retailer.id,
                error = %e,
                "failed to record source outcome"
            );
        }
    }
}

/// Marks a run failed, swallowing bookkeeping errors so the original failure
/// stays the one reported.
async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(mark_err) = droptrack_db::fail_sync_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %mark_err, "failed to record run failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droptrack_core::{ReleaseStatus, SourceKind};
    use droptrack_realtime::RELEASES_UPDATED;
    use std::sync::Mutex;

    fn make_retailer(id: &str, enabled: bool) -> RetailerConfig {
        RetailerConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            kind: SourceKind::Shopify,
            base_url: format!("https://{id}.example.com/products.json"),
            currency: None,
            region: None,
            enabled,
            notes: None,
        }
    }

    fn make_release(id: &str) -> Release {
        Release {
            id: id.to_string(),
            source_key: id.to_string(),
            retailer_id: "feature".to_string(),
            retailer_name: "Feature".to_string(),
            product_name: None,
            release_date: None,
            price: None,
            currency: "USD".to_string(),
            status: ReleaseStatus::Upcoming,
            url: format!("https://feature.com/products/{id}"),
            region: "US".to_string(),
            images: vec![],
        }
    }

    /// Notifier that records channel names in publish order.
    struct RecordingNotifier {
        channels: Mutex<Vec<&'static str>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                channels: Mutex::new(Vec::new()),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn publish(&self, event: ReleaseEvent) {
            self.channels.lock().unwrap().push(event.channel());
        }
    }

    #[test]
    fn select_retailers_keeps_only_enabled_by_default() {
        let retailers = vec![make_retailer("feature", true), make_retailer("paused", false)];
        let selected = select_retailers(&retailers, None).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "feature");
    }

    #[test]
    fn select_retailers_filter_picks_one() {
        let retailers = vec![make_retailer("feature", true), make_retailer("locker", true)];
        let selected = select_retailers(&retailers, Some("locker")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "locker");
    }

    #[test]
    fn select_retailers_unknown_filter_errors() {
        let retailers = vec![make_retailer("feature", true)];
        let err = select_retailers(&retailers, Some("nope")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn select_retailers_disabled_filter_errors() {
        let retailers = vec![make_retailer("paused", false)];
        let err = select_retailers(&retailers, Some("paused")).unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn cycle_events_emit_all_new_items_before_the_list_update() {
        let notifier = RecordingNotifier::new();
        let inserted = vec![make_release("feature-a"), make_release("feature-b")];
        let merged = vec![
            make_release("feature-a"),
            make_release("feature-b"),
            make_release("feature-old"),
        ];

        publish_cycle_events(&notifier, inserted, merged);

        let channels = notifier.channels.lock().unwrap();
        assert_eq!(
            channels.as_slice(),
            ["release:new", "release:new", RELEASES_UPDATED]
        );
    }

    #[test]
    fn cycle_events_with_no_inserts_still_update_the_list() {
        let notifier = RecordingNotifier::new();
        publish_cycle_events(&notifier, vec![], vec![make_release("feature-a")]);
        let channels = notifier.channels.lock().unwrap();
        assert_eq!(channels.as_slice(), [RELEASES_UPDATED]);
    }
}
