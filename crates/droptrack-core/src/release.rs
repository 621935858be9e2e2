use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a release, derived from retailer-side signals.
///
/// Sources rarely agree on vocabulary: Shopify exposes an `available`
/// boolean, catalog feeds use free-text status strings. Anything the
/// normalizer cannot recognize lands on [`ReleaseStatus::Upcoming`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseStatus {
    Live,
    Upcoming,
    Released,
    Delayed,
    Cancelled,
}

impl ReleaseStatus {
    /// Stable lowercase name, matching the wire and database representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseStatus::Live => "live",
            ReleaseStatus::Upcoming => "upcoming",
            ReleaseStatus::Released => "released",
            ReleaseStatus::Delayed => "delayed",
            ReleaseStatus::Cancelled => "cancelled",
        }
    }

    /// Maps a retailer-side status string onto the canonical enum.
    ///
    /// Unrecognized or empty values default to [`ReleaseStatus::Upcoming`] —
    /// the normalizer must stay total over arbitrary source shapes.
    #[must_use]
    pub fn from_source(value: &str) -> Self {
        // schema.org availability values arrive as full URLs; keep the last
        // path segment ("https://schema.org/InStock" -> "InStock").
        let value = value.trim().rsplit('/').next().unwrap_or_default();
        match value.to_lowercase().as_str() {
            "live" | "available" | "active" | "instock" | "in_stock" | "in-stock" => {
                ReleaseStatus::Live
            }
            "released" | "sold_out" | "sold-out" | "soldout" | "outofstock" | "past" => {
                ReleaseStatus::Released
            }
            "delayed" | "postponed" => ReleaseStatus::Delayed,
            "cancelled" | "canceled" | "discontinued" => ReleaseStatus::Cancelled,
            _ => ReleaseStatus::Upcoming,
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ReleaseStatus::Live),
            "upcoming" => Ok(ReleaseStatus::Upcoming),
            "released" => Ok(ReleaseStatus::Released),
            "delayed" => Ok(ReleaseStatus::Delayed),
            "cancelled" => Ok(ReleaseStatus::Cancelled),
            other => Err(format!("unknown release status: {other}")),
        }
    }
}

/// A sneaker release normalized from one retailer source, ready for storage
/// and fanout.
///
/// Instances are rebuilt from raw source data on every aggregation cycle and
/// replace the stored version wholesale; nothing is carried over from a prior
/// cycle's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Natural key: `<retailer_id>-<source_key>`. Stable across runs for any
    /// source item that exposes a native id or handle.
    pub id: String,
    /// Source-derived identifier component of `id`: native product id, else
    /// handle/slug, else a time-based generated token. Stored separately so
    /// the database can key its upsert on `(retailer_id, source_key)`.
    pub source_key: String,
    pub retailer_id: String,
    pub retailer_name: String,
    /// First present of the source's title-like fields. `None` only for raw
    /// records with no recognizable name candidate at all.
    pub product_name: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    /// Retail price; `None` (not zero) when the source carries no price.
    pub price: Option<f64>,
    /// ISO 4217 code; `"USD"` unless the source or retailer says otherwise.
    pub currency: String,
    pub status: ReleaseStatus,
    /// Canonical product URL, rebuilt deterministically from the retailer
    /// base and the source identifier.
    pub url: String,
    pub region: String,
    /// Ordered image URLs; the first entry is the display image. An empty
    /// vec is valid and means "no image" downstream.
    pub images: Vec<String>,
}

impl Release {
    /// Returns the primary/display image, if the source provided any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Returns `true` when the release can currently be purchased.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == ReleaseStatus::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_release(images: Vec<String>) -> Release {
        Release {
            id: "feature-air-max-1".to_string(),
            source_key: "air-max-1".to_string(),
            retailer_id: "feature".to_string(),
            retailer_name: "Feature".to_string(),
            product_name: Some("Air Max 1".to_string()),
            release_date: None,
            price: Some(130.0),
            currency: "USD".to_string(),
            status: ReleaseStatus::Live,
            url: "https://feature.com/collections/footwear.json/products/air-max-1".to_string(),
            region: "US".to_string(),
            images,
        }
    }

    #[test]
    fn primary_image_none_when_no_images() {
        let release = make_release(vec![]);
        assert!(release.primary_image().is_none());
    }

    #[test]
    fn primary_image_is_first_entry() {
        let release = make_release(vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "https://cdn.example.com/b.jpg".to_string(),
        ]);
        assert_eq!(
            release.primary_image(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn is_live_tracks_status() {
        let mut release = make_release(vec![]);
        assert!(release.is_live());
        release.status = ReleaseStatus::Upcoming;
        assert!(!release.is_live());
    }

    #[test]
    fn status_from_source_maps_known_values() {
        assert_eq!(ReleaseStatus::from_source("available"), ReleaseStatus::Live);
        assert_eq!(
            ReleaseStatus::from_source("SOLD_OUT"),
            ReleaseStatus::Released
        );
        assert_eq!(
            ReleaseStatus::from_source("postponed"),
            ReleaseStatus::Delayed
        );
        assert_eq!(
            ReleaseStatus::from_source("canceled"),
            ReleaseStatus::Cancelled
        );
    }

    #[test]
    fn status_from_source_defaults_to_upcoming() {
        assert_eq!(ReleaseStatus::from_source(""), ReleaseStatus::Upcoming);
        assert_eq!(
            ReleaseStatus::from_source("something-new"),
            ReleaseStatus::Upcoming
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ReleaseStatus::Live,
            ReleaseStatus::Upcoming,
            ReleaseStatus::Released,
            ReleaseStatus::Delayed,
            ReleaseStatus::Cancelled,
        ] {
            let parsed: ReleaseStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ReleaseStatus::Live).unwrap();
        assert_eq!(json, "\"live\"");
    }

    #[test]
    fn serde_roundtrip_release() {
        let release = make_release(vec!["https://cdn.example.com/a.jpg".to_string()]);
        let json = serde_json::to_string(&release).expect("serialization failed");
        let decoded: Release = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(decoded.id, release.id);
        assert_eq!(decoded.status, ReleaseStatus::Live);
        assert_eq!(decoded.images.len(), 1);
    }
}
