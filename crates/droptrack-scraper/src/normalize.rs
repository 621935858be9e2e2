//! Normalization from raw retailer JSON to the canonical [`Release`].
//!
//! Normalization is pure and total: any JSON shape the paired adapter can
//! return — including an empty object — produces a valid `Release`. Field
//! resolution runs through the adapter's [`FieldTable`], an ordered list of
//! candidate paths per canonical field, so the fallback order stays
//! auditable and testable independently of fetch logic.

use chrono::Utc;
use serde_json::Value;

use droptrack_core::{Release, ReleaseStatus, RetailerConfig, SourceKind};

use crate::extract::{first_bool, first_datetime, first_f64, first_str, image_urls};
use crate::sources;

/// Ordered candidate paths per canonical field, one table per source kind.
///
/// Candidates are dotted JSON paths (`variants.0.price`); the first path
/// yielding a defined, non-null value wins.
pub struct FieldTable {
    /// Native product identifiers. Highest-priority component of the natural key.
    pub id: &'static [&'static str],
    /// URL slugs. Fall back for the natural key, and preferred for the
    /// product URL (retailers route `/products/<handle>`).
    pub handle: &'static [&'static str],
    pub name: &'static [&'static str],
    pub release_date: &'static [&'static str],
    pub price: &'static [&'static str],
    pub currency: &'static [&'static str],
    /// Availability flags; a `true` here means the release is purchasable now.
    pub available: &'static [&'static str],
    /// Explicit status strings; takes precedence over the availability flag.
    pub status: &'static [&'static str],
    pub region: &'static [&'static str],
    pub images: &'static [&'static str],
}

/// The candidate table paired with a retailer's fetch adapter.
#[must_use]
pub(crate) fn table_for(kind: SourceKind) -> &'static FieldTable {
    match kind {
        SourceKind::Shopify => &sources::shopify::FIELDS,
        SourceKind::Catalog => &sources::catalog::FIELDS,
        SourceKind::Rendered => &sources::rendered::FIELDS,
    }
}

/// Normalizes one raw source record into a [`Release`].
///
/// Never fails. Fields with no matching candidate take their documented
/// defaults: `None` for optionals, the retailer/global default for
/// `currency`/`region`, [`ReleaseStatus::Upcoming`] for `status`, an empty
/// vec for `images`.
///
/// When neither a native id nor a handle is present, the natural key falls
/// back to a time-based generated token. Such records can re-persist under a
/// new key on later runs; that duplication is an accepted trade-off for
/// keeping long-tail items at all.
#[must_use]
pub fn normalize_record(retailer: &RetailerConfig, raw: &Value) -> Release {
    let table = table_for(retailer.kind);

    let native_id = first_str(raw, table.id);
    let handle = first_str(raw, table.handle);

    let source_key = native_id
        .clone()
        .or_else(|| handle.clone())
        .unwrap_or_else(generated_token);

    // Retailers route product pages by handle; the native id is only used
    // when no handle exists.
    let url_ident = handle.as_deref().unwrap_or(source_key.as_str());
    let url = format!(
        "{}/products/{}",
        retailer.base_url.trim_end_matches('/'),
        url_ident
    );

    let status = first_str(raw, table.status)
        .map(|s| ReleaseStatus::from_source(&s))
        .or_else(|| {
            first_bool(raw, table.available).map(|available| {
                if available {
                    ReleaseStatus::Live
                } else {
                    ReleaseStatus::Released
                }
            })
        })
        .unwrap_or(ReleaseStatus::Upcoming);

    Release {
        id: format!("{}-{}", retailer.id, source_key),
        source_key,
        retailer_id: retailer.id.clone(),
        retailer_name: retailer.name.clone(),
        product_name: first_str(raw, table.name),
        release_date: first_datetime(raw, table.release_date),
        price: first_f64(raw, table.price),
        currency: first_str(raw, table.currency)
            .unwrap_or_else(|| retailer.default_currency().to_owned()),
        status,
        url,
        region: first_str(raw, table.region)
            .unwrap_or_else(|| retailer.default_region().to_owned()),
        images: image_urls(raw, table.images),
    }
}

/// Time-based fallback token for records exposing no usable identifier.
fn generated_token() -> String {
    format!("gen-{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature_retailer() -> RetailerConfig {
        RetailerConfig {
            id: "feature".to_string(),
            name: "Feature".to_string(),
            kind: SourceKind::Shopify,
            base_url: "https://feature.com/collections/footwear.json".to_string(),
            currency: None,
            region: None,
            enabled: true,
            notes: None,
        }
    }

    #[test]
    fn normalizes_the_reference_shopify_record() {
        let raw = json!({
            "title": "Air Max 1",
            "variants": [{"price": 130}],
            "available": true,
            "handle": "air-max-1"
        });
        let release = normalize_record(&feature_retailer(), &raw);

        assert_eq!(release.id, "feature-air-max-1");
        assert_eq!(release.product_name.as_deref(), Some("Air Max 1"));
        assert_eq!(release.price, Some(130.0));
        assert_eq!(release.currency, "USD");
        assert_eq!(release.status, ReleaseStatus::Live);
        assert_eq!(release.retailer_id, "feature");
        assert_eq!(
            release.url,
            "https://feature.com/collections/footwear.json/products/air-max-1"
        );
        assert_eq!(release.region, "US");
    }

    #[test]
    fn native_id_outranks_handle_for_the_natural_key() {
        let raw = json!({
            "id": 6_789_012_345_678_i64,
            "handle": "air-max-1",
            "title": "Air Max 1"
        });
        let release = normalize_record(&feature_retailer(), &raw);
        assert_eq!(release.id, "feature-6789012345678");
        assert_eq!(release.source_key, "6789012345678");
        // The URL still routes by handle.
        assert!(release.url.ends_with("/products/air-max-1"));
    }

    #[test]
    fn empty_record_gets_defaults_and_a_generated_key() {
        let raw = json!({});
        let release = normalize_record(&feature_retailer(), &raw);

        assert!(release.product_name.is_none());
        assert!(release.release_date.is_none());
        assert!(release.price.is_none());
        assert_eq!(release.status, ReleaseStatus::Upcoming);
        assert_eq!(release.currency, "USD");
        assert_eq!(release.region, "US");
        assert!(release.images.is_empty());
        assert!(
            release.source_key.starts_with("gen-"),
            "expected generated key, got {}",
            release.source_key
        );
        assert!(release.id.starts_with("feature-gen-"));
    }

    #[test]
    fn normalization_is_idempotent_for_keyed_records() {
        let raw = json!({"handle": "air-max-1", "title": "Air Max 1"});
        let retailer = feature_retailer();
        let first = normalize_record(&retailer, &raw);
        let second = normalize_record(&retailer, &raw);
        assert_eq!(first.id, second.id);
        assert_eq!(first.url, second.url);
    }

    #[test]
    fn unavailable_flag_maps_to_released() {
        let raw = json!({"handle": "dunk-low", "available": false});
        let release = normalize_record(&feature_retailer(), &raw);
        assert_eq!(release.status, ReleaseStatus::Released);
    }

    #[test]
    fn explicit_status_string_outranks_availability_flag() {
        let raw = json!({"handle": "dunk-low", "available": true, "status": "cancelled"});
        let release = normalize_record(&feature_retailer(), &raw);
        assert_eq!(release.status, ReleaseStatus::Cancelled);
    }

    #[test]
    fn price_coerces_from_decimal_string() {
        let raw = json!({"handle": "dunk-low", "variants": [{"price": "129.99"}]});
        let release = normalize_record(&feature_retailer(), &raw);
        assert_eq!(release.price, Some(129.99));
    }

    #[test]
    fn unparseable_release_date_is_null_not_an_error() {
        let raw = json!({"handle": "dunk-low", "published_at": "early summer"});
        let release = normalize_record(&feature_retailer(), &raw);
        assert!(release.release_date.is_none());
    }

    #[test]
    fn retailer_defaults_apply_for_currency_and_region() {
        let mut retailer = feature_retailer();
        retailer.currency = Some("GBP".to_string());
        retailer.region = Some("UK".to_string());
        let release = normalize_record(&retailer, &json!({"handle": "x"}));
        assert_eq!(release.currency, "GBP");
        assert_eq!(release.region, "UK");
    }

    #[test]
    fn shopify_images_preserve_order() {
        let raw = json!({
            "handle": "air-max-1",
            "images": [
                {"src": "https://cdn.shopify.com/a.jpg"},
                {"src": "https://cdn.shopify.com/b.jpg"}
            ]
        });
        let release = normalize_record(&feature_retailer(), &raw);
        assert_eq!(release.primary_image(), Some("https://cdn.shopify.com/a.jpg"));
        assert_eq!(release.images.len(), 2);
    }

    #[test]
    fn catalog_record_resolves_catalog_candidates() {
        let retailer = RetailerConfig {
            id: "lacefinder".to_string(),
            name: "Lacefinder".to_string(),
            kind: SourceKind::Catalog,
            base_url: "https://lacefinder.example.com/api/v2/releases".to_string(),
            currency: None,
            region: None,
            enabled: true,
            notes: None,
        };
        let raw = json!({
            "productId": "DZ5485-612",
            "name": "Air Jordan 1 Lost & Found",
            "releaseDate": "2026-11-19",
            "retailPrice": 180,
            "imageUrl": "https://img.lacefinder.example.com/dz5485.jpg",
            "status": "upcoming"
        });
        let release = normalize_record(&retailer, &raw);
        assert_eq!(release.id, "lacefinder-DZ5485-612");
        assert_eq!(
            release.product_name.as_deref(),
            Some("Air Jordan 1 Lost & Found")
        );
        assert_eq!(release.price, Some(180.0));
        assert_eq!(release.status, ReleaseStatus::Upcoming);
        assert_eq!(
            release.release_date.unwrap().to_rfc3339(),
            "2026-11-19T00:00:00+00:00"
        );
        assert_eq!(release.images.len(), 1);
    }

    #[test]
    fn rendered_record_resolves_json_ld_candidates() {
        let retailer = RetailerConfig {
            id: "locker".to_string(),
            name: "Locker".to_string(),
            kind: SourceKind::Rendered,
            base_url: "https://locker.example.com/release-dates".to_string(),
            currency: None,
            region: None,
            enabled: true,
            notes: None,
        };
        let raw = json!({
            "@type": "Product",
            "sku": "FD2596-107",
            "name": "Jordan 4 Retro",
            "image": "https://images.locker.example.com/fd2596.jpg",
            "offers": {
                "price": "214.99",
                "priceCurrency": "USD",
                "availability": "https://schema.org/InStock"
            }
        });
        let release = normalize_record(&retailer, &raw);
        assert_eq!(release.id, "locker-FD2596-107");
        assert_eq!(release.price, Some(214.99));
        assert_eq!(release.status, ReleaseStatus::Live);
        assert_eq!(release.currency, "USD");
    }
}
