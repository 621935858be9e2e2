use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Which fetch adapter a retailer is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Shopify storefront collection endpoint returning `{"products": [...]}`.
    Shopify,
    /// Bespoke catalog JSON endpoint; list shape varies per retailer.
    Catalog,
    /// JavaScript-rendered page; product data is extracted from embedded JSON.
    Rendered,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Shopify => write!(f, "shopify"),
            SourceKind::Catalog => write!(f, "catalog"),
            SourceKind::Rendered => write!(f, "rendered"),
        }
    }
}

/// One configured retailer source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailerConfig {
    /// Short stable identifier; becomes the prefix of every release id from
    /// this source.
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
    /// Endpoint the adapter fetches, and the base every product URL is built
    /// from.
    pub base_url: String,
    /// Currency applied when the source does not carry one.
    pub currency: Option<String>,
    /// Region applied when the source does not carry one.
    pub region: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub notes: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl RetailerConfig {
    /// Currency to fall back to for this retailer.
    #[must_use]
    pub fn default_currency(&self) -> &str {
        self.currency.as_deref().unwrap_or("USD")
    }

    /// Region to fall back to for this retailer.
    #[must_use]
    pub fn default_region(&self) -> &str {
        self.region.as_deref().unwrap_or("US")
    }
}

#[derive(Debug, Deserialize)]
pub struct RetailersFile {
    pub retailers: Vec<RetailerConfig>,
}

impl RetailersFile {
    /// Returns the retailers that should take part in a sync cycle.
    #[must_use]
    pub fn enabled(&self) -> Vec<RetailerConfig> {
        self.retailers
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect()
    }
}

/// Load and validate the retailer registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_retailers(path: &Path) -> Result<RetailersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RetailersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let retailers_file: RetailersFile =
        serde_yaml::from_str(&content).map_err(ConfigError::RetailersFileParse)?;

    validate_retailers(&retailers_file)?;

    Ok(retailers_file)
}

fn validate_retailers(retailers_file: &RetailersFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for retailer in &retailers_file.retailers {
        if retailer.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "retailer id must be non-empty".to_string(),
            ));
        }

        if retailer.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' has an empty name",
                retailer.id
            )));
        }

        if !retailer.base_url.starts_with("http://") && !retailer.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "retailer '{}' has a non-http base_url: '{}'",
                retailer.id, retailer.base_url
            )));
        }

        if !seen_ids.insert(retailer.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate retailer id: '{}'",
                retailer.id
            )));
        }
    }

    Ok(())
}
