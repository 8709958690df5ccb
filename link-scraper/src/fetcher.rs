//! Page Fetching Module
//!
//! Downloads a page over HTTP(S) and hands the HTML to the metadata
//! extractor. Bulk fetches run one after another with a fixed pause between
//! requests so a large import does not hammer any single site.

use crate::metadata::extract_metadata;
use linkshelf_core::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP settings for metadata fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Timeout for HTTP requests in seconds
    pub request_timeout_secs: u64,
    /// Maximum body size to read in bytes
    pub max_content_size: u64,
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Whether to follow redirects
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow
    pub max_redirects: usize,
    /// Pause between requests of a bulk fetch
    pub bulk_delay_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            max_content_size: 5 * 1024 * 1024, // 5MB
            user_agent: "Mozilla/5.0 (compatible; Linkshelf/0.1; +https://github.com/linkshelf)".to_string(),
            follow_redirects: true,
            max_redirects: 5,
            bulk_delay_ms: 500,
        }
    }
}

/// A downloaded HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL the request was made for
    pub requested_url: String,
    /// URL the content came from after redirects
    pub final_url: String,
    pub html: String,
}

/// Metadata fetched for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMetadata {
    pub final_url: String,
    pub metadata: ExtractedMetadata,
}

/// Fetches pages and extracts their metadata
pub struct MetadataFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl MetadataFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Self {
        Self::with_settings(FetchSettings::default())
    }

    /// Create a fetcher with custom settings
    pub fn with_settings(settings: FetchSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .redirect(if settings.follow_redirects {
                reqwest::redirect::Policy::limited(settings.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .user_agent(&settings.user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, settings }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Download one page
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        if !is_fetchable(url) {
            return Err(FetchError::InvalidUrl { url: url.to_string() }.into());
        }

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(url, &e))?;

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let limit = self.settings.max_content_size;
        if let Some(declared) = response.content_length() {
            if declared > limit {
                return Err(too_large(url, declared, limit));
            }
        }

        // Content-Length can be missing or wrong, so count as we read
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_error(url, &e))?
        {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > limit {
                return Err(too_large(url, body.len() as u64, limit));
            }
        }

        debug!("Fetched {} bytes from {}", body.len(), final_url);

        Ok(FetchedPage {
            requested_url: url.to_string(),
            final_url,
            html: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Download a page and extract its metadata
    ///
    /// Relative icon and image references resolve against the URL the page
    /// was finally served from.
    pub async fn fetch_metadata(&self, url: &str) -> Result<FetchedMetadata> {
        let page = self.fetch_page(url).await?;
        let metadata = extract_metadata(&page.html, &page.final_url);
        Ok(FetchedMetadata {
            final_url: page.final_url,
            metadata,
        })
    }

    /// Fetch metadata for several URLs in order, pausing between requests
    ///
    /// Results line up with `urls`; a failed URL never stops the batch.
    pub async fn fetch_metadata_bulk(&self, urls: &[String]) -> Vec<(String, Result<FetchedMetadata>)> {
        let delay = Duration::from_millis(self.settings.bulk_delay_ms);
        let mut results = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = self.fetch_metadata(url).await;
            if let Err(e) = &result {
                warn!("Metadata fetch failed for {}: {}", url, e);
            }
            results.push((url.clone(), result));
        }

        results
    }
}

impl Default for MetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Only http and https pages are fetched
fn is_fetchable(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}

fn request_error(url: &str, e: &reqwest::Error) -> LinkshelfError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }.into()
    } else if e.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            details: "Connection failed".to_string(),
        }
        .into()
    } else {
        FetchError::Network {
            url: url.to_string(),
            details: e.to_string(),
        }
        .into()
    }
}

fn too_large(url: &str, size: u64, limit: u64) -> LinkshelfError {
    FetchError::ContentTooLarge {
        url: url.to_string(),
        size,
        limit,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FetchSettings::default();
        assert_eq!(settings.request_timeout_secs, 15);
        assert_eq!(settings.max_content_size, 5 * 1024 * 1024);
        assert!(settings.follow_redirects);
        assert_eq!(settings.max_redirects, 5);
        assert_eq!(settings.bulk_delay_ms, 500);
    }

    #[test]
    fn test_settings_fill_missing_fields() {
        let settings: FetchSettings =
            serde_json::from_str(r#"{"request_timeout_secs": 3}"#).unwrap();
        assert_eq!(settings.request_timeout_secs, 3);
        assert_eq!(settings.max_redirects, 5);
    }

    #[test]
    fn test_is_fetchable() {
        assert!(is_fetchable("https://example.com"));
        assert!(is_fetchable("http://localhost:8080/page"));
        assert!(!is_fetchable("ftp://example.com/file"));
        assert!(!is_fetchable("javascript:alert(1)"));
        assert!(!is_fetchable("example.com"));
        assert!(!is_fetchable(""));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_urls() {
        let fetcher = MetadataFetcher::new();
        let result = fetcher.fetch_page("file:///etc/hosts").await;
        assert!(matches!(
            result,
            Err(LinkshelfError::Fetch {
                source: FetchError::InvalidUrl { .. }
            })
        ));
    }

    #[tokio::test]
    async fn test_bulk_keeps_going_after_failures() {
        let fetcher = MetadataFetcher::with_settings(FetchSettings {
            bulk_delay_ms: 0,
            ..FetchSettings::default()
        });
        let urls = vec!["not a url".to_string(), "mailto:a@b.c".to_string()];

        let results = fetcher.fetch_metadata_bulk(&urls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "not a url");
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
