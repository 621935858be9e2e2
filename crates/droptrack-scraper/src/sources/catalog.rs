//! Fetch adapter for bespoke catalog JSON endpoints.
//!
//! These are retailer-specific release APIs with no shared schema. The list
//! itself may arrive as a top-level array or nested under one of several
//! conventional keys; the first present wins, mirroring the per-field
//! candidate policy.

use serde_json::Value;

use droptrack_core::RetailerConfig;

use crate::client::SourceClient;
use crate::error::FetchError;
use crate::normalize::FieldTable;

/// Keys under which catalog APIs have been observed to nest their list.
const LIST_KEYS: &[&str] = &["releases", "products", "items", "data", "results"];

/// Candidate paths for catalog release records.
pub(crate) static FIELDS: FieldTable = FieldTable {
    id: &["id", "productId", "product_id", "sku", "styleId", "style_code"],
    handle: &["slug", "handle", "urlKey"],
    name: &["name", "title", "productName", "shoe_name"],
    release_date: &["releaseDate", "release_date", "launchDate", "date"],
    price: &["price", "retailPrice", "retail_price", "salePrice"],
    currency: &["currency", "currencyCode"],
    available: &["available", "inStock", "in_stock"],
    status: &["status", "state"],
    region: &["region", "market", "country"],
    images: &["images", "imageUrl", "image_url", "image", "media"],
};

/// Fetches the release list from a catalog endpoint.
///
/// # Errors
///
/// Propagates transport and JSON-parse failures from [`SourceClient`].
pub(crate) async fn fetch(
    client: &SourceClient,
    retailer: &RetailerConfig,
) -> Result<Vec<Value>, FetchError> {
    let body = client.get_json(&retailer.base_url).await?;
    Ok(extract_list(&body))
}

/// Pulls the record list out of whatever envelope the endpoint uses.
fn extract_list(body: &Value) -> Vec<Value> {
    if let Some(items) = body.as_array() {
        return items.clone();
    }

    for key in LIST_KEYS {
        if let Some(items) = body.get(*key).and_then(Value::as_array) {
            return items.clone();
        }
    }

    Vec::new()
}
