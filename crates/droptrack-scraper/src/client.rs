//! HTTP client shared by all fetch adapters.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::error::FetchError;
use crate::rate_limit::retry_with_backoff;

/// HTTP client for retailer endpoints.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Transient errors (429, network failures) are
/// automatically retried with exponential backoff up to `max_retries`
/// additional attempts.
pub struct SourceClient {
    client: Client,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl SourceClient {
    /// Creates a `SourceClient` with configured timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for retriable errors. Set to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches `url` and parses the body as JSON, retrying transient errors.
    ///
    /// # Errors
    ///
    /// - [`FetchError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`FetchError::NotFound`] — HTTP 404 (not retried).
    /// - [`FetchError::UnexpectedStatus`] — any other non-2xx status.
    /// - [`FetchError::Http`] — network or TLS failure after all retries.
    /// - [`FetchError::Deserialize`] — body is not valid JSON (not retried).
    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let body = self.get_body(url, "application/json").await?;
        serde_json::from_str::<Value>(&body).map_err(|e| FetchError::Deserialize {
            context: format!("response body from {url}"),
            source: e,
        })
    }

    /// Fetches `url` and returns the raw body text, retrying transient errors.
    ///
    /// Used by the rendered-page adapter, whose payload is HTML with embedded
    /// JSON rather than a JSON document.
    ///
    /// # Errors
    ///
    /// Same transport errors as [`Self::get_json`], minus `Deserialize`.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get_body(url, "text/html,application/json;q=0.9,*/*;q=0.8")
            .await
    }

    async fn get_body(&self, url: &str, accept: &str) -> Result<String, FetchError> {
        let max_retries = self.max_retries;
        let backoff_base_secs = self.backoff_base_secs;

        retry_with_backoff(max_retries, backoff_base_secs, || {
            let url = url.to_owned();
            let accept = accept.to_owned();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(reqwest::header::ACCEPT, accept)
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);

                    return Err(FetchError::RateLimited {
                        domain: extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(FetchError::NotFound { url });
                }

                if !status.is_success() {
                    return Err(FetchError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}

/// Extracts the host from a URL for error reporting; falls back to the raw
/// string when the URL does not parse.
fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Appends query parameters to a base URL, validating the base.
///
/// # Errors
///
/// Returns [`FetchError::InvalidBaseUrl`] if `base_url` cannot be parsed.
pub(crate) fn url_with_params(
    base_url: &str,
    params: &[(&str, &str)],
) -> Result<String, FetchError> {
    let mut url = reqwest::Url::parse(base_url).map_err(|e| FetchError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })?;

    for (key, value) in params {
        url.query_pairs_mut().append_pair(key, value);
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_domain_from_url() {
        assert_eq!(
            extract_domain("https://feature.com/collections/footwear.json"),
            "feature.com"
        );
    }

    #[test]
    fn extract_domain_falls_back_to_raw_string() {
        assert_eq!(extract_domain("not a url"), "not a url");
    }

    #[test]
    fn url_with_params_appends_query() {
        let url = url_with_params(
            "https://feature.com/collections/footwear.json",
            &[("limit", "250")],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://feature.com/collections/footwear.json?limit=250"
        );
    }

    #[test]
    fn url_with_params_preserves_existing_query() {
        let url = url_with_params(
            "https://shop.example.com/api/releases?brand=nike",
            &[("limit", "100")],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://shop.example.com/api/releases?brand=nike&limit=100"
        );
    }

    #[test]
    fn url_with_params_rejects_invalid_base() {
        let err = url_with_params("not a url", &[("limit", "250")]).unwrap_err();
        assert!(matches!(err, FetchError::InvalidBaseUrl { .. }));
    }
}
