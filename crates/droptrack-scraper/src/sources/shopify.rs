//! Fetch adapter for Shopify storefront collection endpoints.
//!
//! Shopify exposes `{"products": [...]}` at public `*.json` collection URLs.
//! Only the first page is fetched; `limit=250` is the endpoint's maximum.

use serde_json::Value;

use droptrack_core::RetailerConfig;

use crate::client::{url_with_params, SourceClient};
use crate::error::FetchError;
use crate::normalize::FieldTable;

const PAGE_LIMIT: &str = "250";

/// Candidate paths for Shopify product records.
///
/// `published_at` doubles as the release signal: stores schedule drops by
/// publishing with a future timestamp.
pub(crate) static FIELDS: FieldTable = FieldTable {
    id: &["id"],
    handle: &["handle"],
    name: &["title"],
    release_date: &["published_at", "created_at"],
    price: &["variants.0.price", "price"],
    currency: &["currency", "variants.0.currency"],
    available: &["available", "variants.0.available"],
    status: &["status"],
    region: &["region"],
    images: &["images", "image"],
};

/// Fetches the product list from a Shopify collection endpoint.
///
/// A response without a `products` array is treated as an empty collection,
/// not an error — some stores return `{}` for hidden collections.
///
/// # Errors
///
/// Propagates transport and JSON-parse failures from [`SourceClient`].
pub(crate) async fn fetch(
    client: &SourceClient,
    retailer: &RetailerConfig,
) -> Result<Vec<Value>, FetchError> {
    let url = url_with_params(&retailer.base_url, &[("limit", PAGE_LIMIT)])?;
    let body = client.get_json(&url).await?;

    let products = body
        .get("products")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(products)
}
