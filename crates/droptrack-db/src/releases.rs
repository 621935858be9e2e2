//! Database operations for the `releases` table — the persistence gateway.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use droptrack_core::{Release, ReleaseStatus};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `releases` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReleaseRow {
    pub id: i64,
    /// Derived natural id, `<retailer_id>-<source_key>`.
    pub release_id: String,
    pub source_key: String,
    pub retailer_id: String,
    pub retailer_name: String,
    pub product_name: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    /// `NUMERIC(10,2)`; the scrape-time `f64` is rounded at write time.
    pub price: Option<Decimal>,
    pub currency: String,
    pub status: String,
    pub url: String,
    pub region: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReleaseRow {
    /// Converts the stored row back into the canonical entity, for the
    /// known-state load at cycle start and for API payloads.
    ///
    /// A status string the enum no longer recognizes maps to `upcoming`
    /// rather than failing — old rows must stay readable.
    #[must_use]
    pub fn into_release(self) -> Release {
        Release {
            id: self.release_id,
            source_key: self.source_key,
            retailer_id: self.retailer_id,
            retailer_name: self.retailer_name,
            product_name: self.product_name,
            release_date: self.release_date,
            price: self.price.and_then(|d| d.to_f64()),
            currency: self.currency,
            status: self.status.parse().unwrap_or(ReleaseStatus::Upcoming),
            url: self.url,
            region: self.region,
            images: self.images,
        }
    }
}

/// Outcome of one item's upsert, reported individually per the gateway
/// contract — a failing item never aborts the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReleaseWriteResult {
    pub release_id: String,
    pub outcome: WriteOutcome,
}

/// Filters for [`list_releases`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseListFilters<'a> {
    pub retailer_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub limit: Option<i64>,
}

const SELECT_COLUMNS: &str = "id, release_id, source_key, retailer_id, retailer_name, \
     product_name, release_date, price, currency, status, url, region, images, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Upserts a single release row.
///
/// Conflicts on the natural key `(retailer_id, source_key)` overwrite every
/// mutable column and bump `updated_at`; nothing from the prior version is
/// preserved. `created_at` is store-managed and untouched on update.
///
/// Returns whether the row was inserted or updated, via `xmax = 0` (an
/// updated row carries the deleting transaction's id in `xmax`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_release(pool: &PgPool, release: &Release) -> Result<WriteOutcome, DbError> {
    let inserted: bool = sqlx::query_scalar::<_, bool>(
        "INSERT INTO releases \
             (release_id, source_key, retailer_id, retailer_name, product_name, \
              release_date, price, currency, status, url, region, images) \
         VALUES ($1, $2, $3, $4, $5, \
                 $6, $7::numeric(10,2), $8, $9, $10, $11, $12) \
         ON CONFLICT (retailer_id, source_key) DO UPDATE SET \
             release_id    = EXCLUDED.release_id, \
             retailer_name = EXCLUDED.retailer_name, \
             product_name  = EXCLUDED.product_name, \
             release_date  = EXCLUDED.release_date, \
             price         = EXCLUDED.price, \
             currency      = EXCLUDED.currency, \
             status        = EXCLUDED.status, \
             url           = EXCLUDED.url, \
             region        = EXCLUDED.region, \
             images        = EXCLUDED.images, \
             updated_at    = NOW() \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&release.id)
    .bind(&release.source_key)
    .bind(&release.retailer_id)
    .bind(&release.retailer_name)
    .bind(&release.product_name)
    .bind(release.release_date)
    .bind(release.price)
    .bind(&release.currency)
    .bind(release.status.as_str())
    .bind(&release.url)
    .bind(&release.region)
    .bind(&release.images)
    .fetch_one(pool)
    .await?;

    Ok(if inserted {
        WriteOutcome::Inserted
    } else {
        WriteOutcome::Updated
    })
}

/// Upserts a batch of releases, one outcome per item.
///
/// Each item's result is independent: a constraint violation or transient
/// failure on one row is recorded as [`WriteOutcome::Failed`] and the batch
/// continues. Callers decide whether an all-failed batch is fatal.
pub async fn upsert_releases(pool: &PgPool, releases: &[Release]) -> Vec<ReleaseWriteResult> {
    let mut results = Vec::with_capacity(releases.len());

    for release in releases {
        let outcome = match upsert_release(pool, release).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    release_id = %release.id,
                    error = %e,
                    "release upsert failed"
                );
                WriteOutcome::Failed(e.to_string())
            }
        };
        results.push(ReleaseWriteResult {
            release_id: release.id.clone(),
            outcome,
        });
    }

    results
}

// ---------------------------------------------------------------------------
// Read path
// ---------------------------------------------------------------------------

/// Lists releases with optional retailer/status filters, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_releases(
    pool: &PgPool,
    filters: ReleaseListFilters<'_>,
) -> Result<Vec<ReleaseRow>, DbError> {
    let limit = filters.limit.unwrap_or(100);

    let rows = sqlx::query_as::<_, ReleaseRow>(&format!(
        "SELECT {SELECT_COLUMNS} \
         FROM releases \
         WHERE ($1::text IS NULL OR retailer_id = $1) \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY updated_at DESC, id DESC \
         LIMIT $3"
    ))
    .bind(filters.retailer_id)
    .bind(filters.status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Loads the full persisted set, the "previously known state" read once at
/// cycle start.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_releases(pool: &PgPool) -> Result<Vec<ReleaseRow>, DbError> {
    let rows = sqlx::query_as::<_, ReleaseRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM releases ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one release by its natural id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_release(pool: &PgPool, release_id: &str) -> Result<Option<ReleaseRow>, DbError> {
    let row = sqlx::query_as::<_, ReleaseRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM releases WHERE release_id = $1"
    ))
    .bind(release_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Deletes one release by its natural id. Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_release(pool: &PgPool, release_id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM releases WHERE release_id = $1")
        .bind(release_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
