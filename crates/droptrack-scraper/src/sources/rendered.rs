//! Fetch adapter for JavaScript-rendered release pages.
//!
//! The browser automation engine itself is out of scope: [`RenderedFetcher`]
//! is an opaque boundary that returns raw HTML, and the default
//! [`HttpRenderedFetcher`] is a plain HTTP fetch (deployments point it at a
//! prerender service instead). Product data is recovered from the JSON these
//! pages embed — `application/ld+json` blocks and inline state blobs.

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde_json::Value;

use droptrack_core::RetailerConfig;

use crate::client::SourceClient;
use crate::error::FetchError;
use crate::normalize::FieldTable;

/// Keys under which embedded state blobs nest their product lists.
const LIST_KEYS: &[&str] = &["products", "releases", "items"];

/// Candidate paths for records lifted out of rendered pages. Covers both
/// schema.org Product nodes and the flatter shapes of inline state blobs.
pub(crate) static FIELDS: FieldTable = FieldTable {
    id: &["sku", "productId", "id", "styleColor", "style_code"],
    handle: &["slug", "handle"],
    name: &["name", "title", "headline"],
    release_date: &["releaseDate", "launchDate", "offers.availabilityStarts"],
    price: &["offers.price", "price", "retailPrice", "retail_price"],
    currency: &["offers.priceCurrency", "currency"],
    available: &["available", "inStock"],
    status: &["offers.availability", "status"],
    region: &["region", "market"],
    images: &["image", "images", "imageUrl"],
};

/// Opaque boundary to whatever renders JavaScript-heavy pages.
///
/// Implementations return the final HTML (or JSON) for a URL; everything
/// downstream treats that body as untrusted text to mine for embedded JSON.
pub trait RenderedFetcher: Send + Sync {
    fn fetch_html<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>>;
}

/// Default fetcher: a plain HTTP GET.
///
/// Good enough for pages that server-render their embedded JSON; sites that
/// only hydrate client-side need a real rendering service behind the same
/// trait.
pub struct HttpRenderedFetcher {
    client: SourceClient,
}

impl HttpRenderedFetcher {
    #[must_use]
    pub fn new(client: SourceClient) -> Self {
        Self { client }
    }
}

impl RenderedFetcher for HttpRenderedFetcher {
    fn fetch_html<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
        self.client.get_text(url).boxed()
    }
}

/// Fetches a rendered page and extracts its embedded product records.
///
/// # Errors
///
/// Propagates transport failures from the fetcher. A page that fetches fine
/// but embeds no recognizable JSON yields an empty list.
pub(crate) async fn fetch(
    fetcher: &dyn RenderedFetcher,
    retailer: &RetailerConfig,
) -> Result<Vec<Value>, FetchError> {
    let html = fetcher.fetch_html(&retailer.base_url).await?;
    Ok(extract_embedded_products(&html))
}

/// Mines an HTML document for product-shaped JSON records.
///
/// Sources, in order: `application/ld+json` script blocks, inline
/// `window.__*__ = {...}` state assignments, and `application/json` script
/// blocks. Unparseable blocks are skipped silently — rendered pages embed
/// plenty of JSON that is not for us.
pub(crate) fn extract_embedded_products(html: &str) -> Vec<Value> {
    let mut records = Vec::new();

    for raw in embedded_json_blocks(html) {
        let Ok(value) = serde_json::from_str::<Value>(&raw) else {
            continue;
        };
        collect_product_nodes(&value, &mut records);
    }

    records
}

fn embedded_json_blocks(html: &str) -> Vec<String> {
    let script_json_re = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/(?:ld\+json|json)["'][^>]*>(.*?)</script>"#,
    )
    .expect("valid embedded-json script regex");

    let state_re = Regex::new(r"(?is)window\.__[A-Z0-9_]+__\s*=\s*(.+?)</script>")
        .expect("valid state assignment regex");

    let mut blocks: Vec<String> = script_json_re
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();

    blocks.extend(
        state_re
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().trim().trim_end_matches(';').trim().to_owned())
            .filter(|s| !s.is_empty()),
    );

    blocks
}

fn collect_product_nodes(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            if looks_like_product_node(map.get("@type")) {
                out.push(value.clone());
                return;
            }

            for (key, child) in map {
                if LIST_KEYS.contains(&key.as_str()) {
                    if let Some(items) = child.as_array() {
                        out.extend(items.iter().filter(|v| v.is_object()).cloned());
                        continue;
                    }
                }
                collect_product_nodes(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_product_nodes(child, out);
            }
        }
        _ => {}
    }
}

fn looks_like_product_node(node_type: Option<&Value>) -> bool {
    let Some(node_type) = node_type else {
        return false;
    };

    let is_product = |s: &str| s.to_lowercase().contains("product");

    match node_type {
        Value::String(s) => is_product(s),
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .any(is_product),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_json_ld_product_nodes() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Product",
             "sku":"FD2596-107","name":"Jordan 4 Retro",
             "offers":{"price":"214.99","priceCurrency":"USD"}}
            </script>
            </head><body></body></html>
        "#;
        let records = extract_embedded_products(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["sku"], json!("FD2596-107"));
    }

    #[test]
    fn extracts_products_from_item_list() {
        let html = r#"
            <script type="application/ld+json">
            {"@type":"ItemList","itemListElement":[
                {"@type":"ListItem","item":{"@type":"Product","sku":"A1","name":"One"}},
                {"@type":"ListItem","item":{"@type":"Product","sku":"A2","name":"Two"}}
            ]}
            </script>
        "#;
        let records = extract_embedded_products(html);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn extracts_products_from_inline_state_blob() {
        let html = r#"
            <script>window.__PRELOADED_STATE__ = {"calendar":{"products":[
                {"sku":"DD1391-100","name":"Dunk Low Panda","price":115},
                {"sku":"DZ5485-612","name":"Jordan 1","price":180}
            ]}};</script>
        "#;
        let records = extract_embedded_products(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["sku"], json!("DD1391-100"));
    }

    #[test]
    fn extracts_from_application_json_script() {
        let html = r#"
            <script type="application/json" id="release-data">
            {"releases":[{"id":"r1","name":"Air Max 1"}]}
            </script>
        "#;
        let records = extract_embedded_products(html);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn page_without_embedded_json_yields_empty() {
        let html = "<html><body><h1>Release calendar</h1></body></html>";
        assert!(extract_embedded_products(html).is_empty());
    }

    #[test]
    fn malformed_json_blocks_are_skipped() {
        let html = r#"
            <script type="application/ld+json">{not json}</script>
            <script type="application/ld+json">{"@type":"Product","sku":"OK-1"}</script>
        "#;
        let records = extract_embedded_products(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["sku"], json!("OK-1"));
    }
}
