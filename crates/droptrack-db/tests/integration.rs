//! Offline unit tests for droptrack-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Utc;
use droptrack_core::{AppConfig, Environment, ReleaseStatus};
use droptrack_db::{PoolConfig, ReleaseRow, SyncRunRow, WriteOutcome};
use rust_decimal::Decimal;
use uuid::Uuid;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        retailers_path: PathBuf::from("./config/retailers.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        fetch_timeout_secs: 30,
        user_agent: "ua".to_string(),
        max_concurrent_sources: 4,
        pause_secs: 1,
        max_retries: 3,
        retry_backoff_base_secs: 5,
        sync_schedule: "0 */15 * * * *".to_string(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn make_release_row() -> ReleaseRow {
    ReleaseRow {
        id: 1,
        release_id: "feature-air-max-1".to_string(),
        source_key: "air-max-1".to_string(),
        retailer_id: "feature".to_string(),
        retailer_name: "Feature".to_string(),
        product_name: Some("Air Max 1".to_string()),
        release_date: None,
        price: Some(Decimal::new(13_000, 2)),
        currency: "USD".to_string(),
        status: "live".to_string(),
        url: "https://feature.com/collections/footwear.json/products/air-max-1".to_string(),
        region: "US".to_string(),
        images: vec!["https://cdn.shopify.com/air-max-1.jpg".to_string()],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn release_row_converts_back_to_canonical_entity() {
    let release = make_release_row().into_release();

    assert_eq!(release.id, "feature-air-max-1");
    assert_eq!(release.source_key, "air-max-1");
    assert_eq!(release.price, Some(130.0));
    assert_eq!(release.status, ReleaseStatus::Live);
    assert_eq!(release.images.len(), 1);
}

#[test]
fn release_row_unknown_status_maps_to_upcoming() {
    let mut row = make_release_row();
    row.status = "mystery".to_string();
    let release = row.into_release();
    assert_eq!(release.status, ReleaseStatus::Upcoming);
}

#[test]
fn write_outcome_distinguishes_insert_update_failure() {
    assert_ne!(WriteOutcome::Inserted, WriteOutcome::Updated);
    let failed = WriteOutcome::Failed("duplicate key".to_string());
    assert!(matches!(failed, WriteOutcome::Failed(ref reason) if reason.contains("duplicate")));
}

/// Compile-time smoke test: confirm [`SyncRunRow`] has all expected fields
/// with the correct types. No database required.
#[test]
fn sync_run_row_has_expected_fields() {
    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        records_processed: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert!(row.error_message.is_none());
}
