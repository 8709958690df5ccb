/// Integration module for Linkshelf
///
/// Wires configuration, logging, storage, the bookmark library and the
/// metadata fetcher together behind one application API.

use anyhow::Context;
use bookmark_manager::BookmarkLibrary;
use data_access::DataStore;
use link_scraper::{FetchSettings, MetadataFetcher};
use linkshelf_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub mod application;
pub mod logger;

pub use application::{Application, BulkAddSummary};
pub use logger::{LoggerConfig, UnifiedLogger};

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "LINKSHELF_DATA_DIR";
/// Environment variable overriding `log_level`
pub const LOG_LEVEL_ENV: &str = "LINKSHELF_LOG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the bookmark documents; in-memory when unset
    pub data_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,

    /// Fetch page metadata when a single URL is added
    pub fetch_metadata_on_add: bool,

    /// HTTP settings for metadata fetching
    pub fetch: FetchSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_level: "info".to_string(),
            fetch_metadata_on_add: true,
            fetch: FetchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply `LINKSHELF_DATA_DIR` and `LINKSHELF_LOG` overrides
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        self
    }
}

/// Application context that holds all initialized components
pub struct AppContext {
    /// Bookmark and collection documents
    pub store: Arc<DataStore>,

    /// Bookmark library over the store
    pub library: Arc<BookmarkLibrary>,

    /// Page metadata fetcher
    pub fetcher: Arc<MetadataFetcher>,

    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,
}

impl AppContext {
    /// Create a new application context with all components initialized
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing application context");

        // Initialize store
        let store = match &config.data_dir {
            Some(dir) => Arc::new(DataStore::open(dir).await?),
            None => Arc::new(DataStore::in_memory()),
        };
        info!("Data store initialized");

        let library = Arc::new(BookmarkLibrary::from_store(&store));
        let fetcher = Arc::new(MetadataFetcher::with_settings(config.fetch.clone()));

        let config = Arc::new(RwLock::new(config));

        info!("Application context initialized successfully");

        Ok(Self {
            store,
            library,
            fetcher,
            config,
        })
    }

    /// Shutdown all components gracefully
    ///
    /// Every write is already on disk, so this only reports final counts.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application context");
        let stats = self.store.stats().await?;
        info!(
            "Application context shutdown complete ({} bookmark(s), {} collection(s))",
            stats.bookmark_count, stats.collection_count
        );
        Ok(())
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> Result<AppStatistics> {
        let bookmarks = self.library.list(&Default::default()).await?;
        let total_collections = self.library.collections().await?.len();

        let tags: HashSet<String> = bookmarks
            .iter()
            .flat_map(|b| b.tags.iter().map(|t| t.to_lowercase()))
            .collect();
        let in_default = bookmarks
            .iter()
            .filter(|b| b.collection_id.is_default())
            .count();

        Ok(AppStatistics {
            total_bookmarks: bookmarks.len(),
            total_collections,
            total_tags: tags.len(),
            uncategorized_bookmarks: in_default,
        })
    }
}

/// Application statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStatistics {
    pub total_bookmarks: usize,
    pub total_collections: usize,
    pub total_tags: usize,
    /// Bookmarks not filed in any named collection
    pub uncategorized_bookmarks: usize,
}
