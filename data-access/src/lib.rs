//! Data Access Layer for Linkshelf
//!
//! Bookmarks and collections live in two JSON documents inside a data
//! directory. Each document is read whole and replaced whole; the last
//! writer wins.

pub mod document;
pub mod repository;

pub use document::JsonDocument;
pub use repository::*;

use linkshelf_core::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub bookmark_count: usize,
    pub collection_count: usize,
}

/// Owner of the bookmark and collection documents
pub struct DataStore {
    data_dir: Option<PathBuf>,
    bookmarks: Arc<JsonBookmarkRepository>,
    collections: Arc<JsonCollectionRepository>,
}

impl DataStore {
    /// Open (or create) a store in the given directory
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let dir = data_dir.as_ref().to_path_buf();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| SystemError::Configuration {
                details: format!("Failed to create data directory {}: {}", dir.display(), e),
            })?;

        let bookmarks = JsonDocument::file(dir.join(document::BOOKMARKS_FILE));
        let collections = JsonDocument::file(dir.join(document::COLLECTIONS_FILE));

        let store = Self::from_documents(Some(dir), bookmarks, collections);

        // Fail early on unreadable documents rather than on first use
        let stats = store.stats().await?;
        info!(
            "Opened data store with {} bookmark(s) and {} collection(s)",
            stats.bookmark_count, stats.collection_count
        );

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Self {
        Self::from_documents(
            None,
            JsonDocument::memory(document::BOOKMARKS_FILE),
            JsonDocument::memory(document::COLLECTIONS_FILE),
        )
    }

    fn from_documents(
        data_dir: Option<PathBuf>,
        bookmarks: JsonDocument,
        collections: JsonDocument,
    ) -> Self {
        Self {
            data_dir,
            bookmarks: Arc::new(JsonBookmarkRepository::new(Arc::new(bookmarks))),
            collections: Arc::new(JsonCollectionRepository::new(Arc::new(collections))),
        }
    }

    /// Directory holding the documents, `None` for in-memory stores
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn bookmarks(&self) -> Arc<dyn BookmarkRepository> {
        self.bookmarks.clone()
    }

    pub fn collections(&self) -> Arc<dyn CollectionRepository> {
        self.collections.clone()
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            bookmark_count: self.bookmarks.count().await?,
            collection_count: self.collections.load_all().await?.len(),
        })
    }
}
