/// Main application module
///
/// Provides high-level Application API

use crate::{AppConfig, AppContext, AppStatistics, LoggerConfig, UnifiedLogger};
use bookmark_manager::{
    canonical_key, strip_ref_param, AddOutcome, BookmarkLibrary, BookmarkRecord, ImportSummary,
    NewBookmark, ScoredBookmark, SearchQuery,
};
use link_scraper::{export_json, export_netscape_html, extract_metadata, extract_urls, parse_import};
use linkshelf_core::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of adding every URL found in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkAddSummary {
    /// Newly stored records, in the order their URLs appeared
    pub added: Vec<BookmarkRecord>,
    /// URLs already stored, or repeated earlier in the text
    pub skipped_duplicates: usize,
    /// URLs stored without metadata because the page could not be fetched
    pub metadata_failures: usize,
}

/// Main application
pub struct Application {
    /// Application context
    context: Arc<AppContext>,
}

impl Application {
    /// Create and initialize a new application
    pub async fn new(config: AppConfig) -> Result<Self> {
        // Initialize logging
        UnifiedLogger::init(LoggerConfig::with_level(config.log_level.clone())).map_err(|e| {
            SystemError::Configuration {
                details: format!("{:#}", e),
            }
        })?;

        info!("Starting Linkshelf");

        // Create application context
        let context = Arc::new(AppContext::new(config).await?);

        info!("Application initialized successfully");

        Ok(Self { context })
    }

    /// Shutdown the application
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application");
        self.context.shutdown().await?;
        info!("Application shutdown complete");
        Ok(())
    }

    /// Get application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    pub fn library(&self) -> &BookmarkLibrary {
        &self.context.library
    }

    // High-level API methods

    /// Add one URL, fetching page metadata first when enabled
    ///
    /// A URL that is already stored is returned without fetching. A failed
    /// fetch never fails the add; the bookmark is stored with its host name
    /// as title.
    pub async fn add_url(&self, url: &str) -> Result<AddOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(LibraryError::EmptyUrl.into());
        }

        if let Some(existing) = self.context.library.find_by_url(url).await? {
            info!("{} is already bookmarked", url);
            return Ok(AddOutcome::AlreadyExists(existing));
        }

        let target = strip_ref_param(url);
        let fetch = self.context.config.read().await.fetch_metadata_on_add;

        let metadata = if fetch {
            match self.context.fetcher.fetch_metadata(&target).await {
                Ok(fetched) => fetched.metadata,
                Err(e) => {
                    warn!("Could not fetch metadata for {}: {}", target, e);
                    fallback_metadata(&target)
                }
            }
        } else {
            fallback_metadata(&target)
        };

        self.context
            .library
            .add(NewBookmark::new(target).with_metadata(metadata))
            .await
    }

    /// Add every URL found in free text
    ///
    /// Pages are fetched one at a time with the configured pause between
    /// requests. Fails with `NoUrlsFound` when the text has no URLs.
    pub async fn add_urls_from_text(&self, text: &str) -> Result<BulkAddSummary> {
        let urls = extract_urls(text)?;
        let mut summary = BulkAddSummary::default();

        let stored: HashSet<String> = self
            .context
            .library
            .list(&CollectionId::Default)
            .await?
            .iter()
            .map(|r| canonical_key(&r.url))
            .collect();

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for url in urls {
            let key = canonical_key(&url);
            if stored.contains(&key) || !seen.insert(key) {
                summary.skipped_duplicates += 1;
            } else {
                pending.push(strip_ref_param(&url));
            }
        }

        let fetch = self.context.config.read().await.fetch_metadata_on_add;
        let fetched = if fetch {
            self.context.fetcher.fetch_metadata_bulk(&pending).await
        } else {
            Vec::new()
        };

        for (index, url) in pending.iter().enumerate() {
            let metadata = match fetched.get(index) {
                Some((_, Ok(page))) => page.metadata.clone(),
                Some((_, Err(_))) => {
                    summary.metadata_failures += 1;
                    fallback_metadata(url)
                }
                None => fallback_metadata(url),
            };

            match self
                .context
                .library
                .add(NewBookmark::new(url.clone()).with_metadata(metadata))
                .await?
            {
                AddOutcome::Added(record) => summary.added.push(record),
                AddOutcome::AlreadyExists(_) => summary.skipped_duplicates += 1,
            }
        }

        info!(
            "Added {} bookmark(s) from text, skipped {} duplicate(s)",
            summary.added.len(),
            summary.skipped_duplicates
        );
        Ok(summary)
    }

    /// Import a bookmark file in any supported format
    pub async fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportSummary> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(SystemError::from)?;

        let entries = parse_import(&content)?;
        info!("Importing {} bookmark(s) from {}", entries.len(), path.display());
        self.context.library.import(entries).await
    }

    /// Write the whole library as a JSON export document
    ///
    /// Returns the number of bookmarks written.
    pub async fn export_json<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let (bookmarks, collections) = self.snapshot().await?;
        let json = export_json(&bookmarks, &collections)?;
        write_export(path.as_ref(), &json).await?;
        Ok(bookmarks.len())
    }

    /// Write the whole library as a Netscape bookmark file
    ///
    /// Returns the number of bookmarks written.
    pub async fn export_html<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let (bookmarks, collections) = self.snapshot().await?;
        let html = export_netscape_html(&bookmarks, &collections);
        write_export(path.as_ref(), &html).await?;
        Ok(bookmarks.len())
    }

    /// Collapse duplicate bookmarks across the whole store
    pub async fn dedupe(&self) -> Result<DedupeReport> {
        self.context.library.dedupe_by_url_in_place().await
    }

    /// Search bookmarks with the search box syntax
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredBookmark>> {
        self.context.library.search(&SearchQuery::parse(query)).await
    }

    /// Get application statistics
    pub async fn stats(&self) -> Result<AppStatistics> {
        self.context.get_stats().await
    }

    async fn snapshot(&self) -> Result<(Vec<BookmarkRecord>, Vec<Collection>)> {
        let bookmarks = self.context.library.list(&CollectionId::Default).await?;
        let collections = self.context.library.collections().await?;
        Ok((bookmarks, collections))
    }
}

/// What a bookmark gets when its page was not fetched: the host name as
/// title and the site's default favicon
fn fallback_metadata(url: &str) -> ExtractedMetadata {
    extract_metadata("", url)
}

async fn write_export(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| StorageError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
    info!("Exported library to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config() -> AppConfig {
        AppConfig {
            fetch_metadata_on_add: false,
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_application_lifecycle() {
        let app = Application::new(offline_config()).await.unwrap();
        let result = app.shutdown().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_add_url_without_fetch_uses_host_title() {
        let app = Application::new(offline_config()).await.unwrap();

        let outcome = app.add_url("https://www.example.com/post?ref=hn").await.unwrap();
        let record = outcome.record();
        assert!(outcome.is_added());
        assert_eq!(record.url, "https://www.example.com/post");
        assert_eq!(record.title, "example.com");
        assert_eq!(record.icon.as_deref(), Some("https://www.example.com/favicon.ico"));

        let again = app.add_url("example.com/post/").await.unwrap();
        assert!(!again.is_added());
    }

    #[tokio::test]
    async fn test_add_url_fetch_failure_degrades() {
        // Fetch is on, but nothing listens on this port
        let config = AppConfig {
            fetch: link_scraper::FetchSettings {
                request_timeout_secs: 2,
                ..Default::default()
            },
            ..AppConfig::default()
        };
        let app = Application::new(config).await.unwrap();

        let outcome = app.add_url("http://127.0.0.1:9/page").await.unwrap();
        assert!(outcome.is_added());
        assert_eq!(outcome.record().title, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_add_empty_url() {
        let app = Application::new(offline_config()).await.unwrap();
        assert!(app.add_url("  ").await.is_err());
    }
}
