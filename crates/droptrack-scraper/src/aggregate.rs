//! Aggregation across sources: concurrent fetch, normalization, and the
//! merge against previously known state.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rand::Rng;
use serde_json::Value;

use droptrack_core::{Release, RetailerConfig};

use crate::client::SourceClient;
use crate::normalize::normalize_record;
use crate::sources::{fetch_list, RenderedFetcher};

/// Runs every retailer source and returns the cycle's normalized releases.
///
/// Sources run concurrently, bounded by `max_concurrent`, so total cycle
/// latency tracks the slowest single source rather than the sum of all of
/// them. Each source issues one request, preceded by a random stagger within
/// `pause_secs` — the same politeness delay that spaces consecutive requests
/// when sources run sequentially (`max_concurrent = 1`).
///
/// A failed or slow source never blocks or drops another source's records:
/// fetch failures are absorbed per-source (see [`fetch_list`]) and
/// normalization is total, so a malformed item can only affect itself.
pub async fn collect_releases(
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    retailers: &[RetailerConfig],
    max_concurrent: usize,
    pause_secs: u64,
) -> Vec<Release> {
    let batches: Vec<Vec<Release>> = stream::iter(retailers.iter().cloned())
        .map(|retailer| collect_source(client, fetcher, retailer, pause_secs))
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    // Within one cycle the same natural key can surface twice (a retailer
    // listing a product in two feeds); the later record wins, matching the
    // cross-cycle merge policy.
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut releases: Vec<Release> = Vec::new();
    for release in batches.into_iter().flatten() {
        match seen.get(&release.id) {
            Some(&idx) => releases[idx] = release,
            None => {
                seen.insert(release.id.clone(), releases.len());
                releases.push(release);
            }
        }
    }

    releases
}

/// Fetches and normalizes one retailer's batch, preceded by the politeness
/// stagger. Factored out of [`collect_releases`] so the per-source future is
/// generic over the retailer borrow's lifetime.
async fn collect_source(
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    retailer: RetailerConfig,
    pause_secs: u64,
) -> Vec<Release> {
    stagger(pause_secs).await;

    let raw = fetch_list(client, fetcher, &retailer).await;
    let releases: Vec<Release> = raw
        .iter()
        .map(|record| normalize_record(&retailer, record))
        .collect();

    tracing::info!(
        source = %retailer.id,
        count = releases.len(),
        "normalized source batch"
    );
    releases
}

/// Sleeps a uniformly random delay in `[0, pause_secs]` before a source's
/// request, spreading concurrent cycle starts across the window.
async fn stagger(pause_secs: u64) {
    if pause_secs == 0 {
        return;
    }
    let delay_ms = rand::rng().random_range(0..=pause_secs.saturating_mul(1000));
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

/// Merges a cycle's output against previously known state by natural key.
///
/// Last write wins, no delete: an incoming record with an existing `id`
/// replaces the stored one wholesale; a new `id` is appended; records known
/// from earlier cycles but absent from this one are left untouched.
#[must_use]
pub fn merge_releases(known: &[Release], incoming: Vec<Release>) -> Vec<Release> {
    let mut merged: Vec<Release> = known.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();

    for release in incoming {
        match index.get(&release.id) {
            Some(&i) => merged[i] = release,
            None => {
                index.insert(release.id.clone(), merged.len());
                merged.push(release);
            }
        }
    }

    merged
}

/// Convenience used by dry runs and tests: normalizes a raw batch for one
/// retailer without touching the network.
#[must_use]
pub fn normalize_batch(retailer: &RetailerConfig, raw: &[Value]) -> Vec<Release> {
    raw.iter()
        .map(|record| normalize_record(retailer, record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use droptrack_core::{ReleaseStatus, SourceKind};

    fn make_release(id: &str, price: Option<f64>) -> Release {
        Release {
            id: id.to_string(),
            source_key: id.rsplit('-').next().unwrap_or(id).to_string(),
            retailer_id: "feature".to_string(),
            retailer_name: "Feature".to_string(),
            product_name: Some("Air Max 1".to_string()),
            release_date: None,
            price,
            currency: "USD".to_string(),
            status: ReleaseStatus::Upcoming,
            url: format!("https://feature.com/products/{id}"),
            region: "US".to_string(),
            images: vec![],
        }
    }

    #[test]
    fn merge_replaces_existing_and_appends_new() {
        let known = vec![make_release("feature-a", Some(100.0))];
        let incoming = vec![
            make_release("feature-a", Some(120.0)),
            make_release("feature-b", Some(90.0)),
        ];

        let merged = merge_releases(&known, incoming);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "feature-a");
        assert_eq!(merged[0].price, Some(120.0), "existing record fully replaced");
        assert_eq!(merged[1].id, "feature-b");
    }

    #[test]
    fn merge_never_deletes_absent_records() {
        let known = vec![
            make_release("feature-a", Some(100.0)),
            make_release("feature-gone", Some(50.0)),
        ];
        let incoming = vec![make_release("feature-a", Some(110.0))];

        let merged = merge_releases(&known, incoming);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|r| r.id == "feature-gone"));
    }

    #[test]
    fn merge_with_empty_incoming_is_identity() {
        let known = vec![make_release("feature-a", Some(100.0))];
        let merged = merge_releases(&known, vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].price, Some(100.0));
    }

    #[test]
    fn normalize_batch_maps_every_record() {
        let retailer = RetailerConfig {
            id: "feature".to_string(),
            name: "Feature".to_string(),
            kind: SourceKind::Shopify,
            base_url: "https://feature.com/collections/footwear.json".to_string(),
            currency: None,
            region: None,
            enabled: true,
            notes: None,
        };
        let raw = vec![
            serde_json::json!({"handle": "air-max-1", "title": "Air Max 1"}),
            serde_json::json!({"handle": "dunk-low", "title": "Dunk Low"}),
        ];
        let releases = normalize_batch(&retailer, &raw);
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].id, "feature-air-max-1");
        assert_eq!(releases[1].id, "feature-dunk-low");
    }
}
