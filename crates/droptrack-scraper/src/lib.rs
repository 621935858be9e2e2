//! Fetch adapters, normalization, and aggregation for retailer sources.
//!
//! Each configured retailer maps to one fetch adapter (`sources`) paired with
//! a field-candidate table consumed by the normalizer (`normalize`). The
//! aggregator runs every enabled source concurrently, funnels raw records
//! through normalization, and merges the result against previously known
//! state by natural key.

mod aggregate;
mod client;
mod error;
mod extract;
mod normalize;
mod rate_limit;
mod sources;

pub use aggregate::{collect_releases, merge_releases, normalize_batch};
pub use client::SourceClient;
pub use error::FetchError;
pub use normalize::{normalize_record, FieldTable};
pub use sources::{fetch_list, fetch_raw, HttpRenderedFetcher, RenderedFetcher};
