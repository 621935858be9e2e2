//! Per-retailer fetch adapters.
//!
//! One adapter per [`SourceKind`], each issuing exactly one outbound request
//! per invocation and returning raw, retailer-shaped JSON records. Pagination
//! is deliberately not handled — only the first page/collection is fetched.

pub(crate) mod catalog;
pub(crate) mod rendered;
pub(crate) mod shopify;

use serde_json::Value;

use droptrack_core::{RetailerConfig, SourceKind};

use crate::client::SourceClient;
use crate::error::FetchError;

pub use rendered::{HttpRenderedFetcher, RenderedFetcher};

/// Fetches raw records for one retailer, dispatching on its source kind.
///
/// # Errors
///
/// Propagates the adapter's [`FetchError`]. Most callers want
/// [`fetch_list`], which absorbs failures at the adapter boundary.
pub async fn fetch_raw(
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    retailer: &RetailerConfig,
) -> Result<Vec<Value>, FetchError> {
    match retailer.kind {
        SourceKind::Shopify => shopify::fetch(client, retailer).await,
        SourceKind::Catalog => catalog::fetch(client, retailer).await,
        SourceKind::Rendered => rendered::fetch(fetcher, retailer).await,
    }
}

/// Fetches raw records for one retailer, absorbing every failure.
///
/// A network error, non-2xx status, or malformed body is logged with the
/// source name and yields an empty list, so a single retailer outage can
/// never abort an aggregation cycle. Retry policy, if any, belongs to the
/// invoking scheduler — failure here is absorbed, not retried.
pub async fn fetch_list(
    client: &SourceClient,
    fetcher: &dyn RenderedFetcher,
    retailer: &RetailerConfig,
) -> Vec<Value> {
    match fetch_raw(client, fetcher, retailer).await {
        Ok(records) => {
            tracing::debug!(
                source = %retailer.id,
                count = records.len(),
                "fetched raw records"
            );
            records
        }
        Err(e) => {
            tracing::warn!(
                source = %retailer.id,
                kind = %retailer.kind,
                error = %e,
                "source fetch failed — continuing with empty result"
            );
            Vec::new()
        }
    }
}
