//! Repository implementations for data access

use linkshelf_core::*;
use crate::document::JsonDocument;
use async_trait::async_trait;
use std::sync::Arc;

/// Repository trait for bookmarks
#[async_trait]
pub trait BookmarkRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<BookmarkRecord>>;
    async fn replace_all(&self, bookmarks: &[BookmarkRecord]) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<BookmarkRecord>>;
    async fn save(&self, bookmark: &BookmarkRecord) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn count(&self) -> Result<usize>;
}

/// Repository trait for collections
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Collection>>;
    async fn replace_all(&self, collections: &[Collection]) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Collection>>;
    async fn save(&self, collection: &Collection) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Bookmark repository over a JSON document
pub struct JsonBookmarkRepository {
    document: Arc<JsonDocument>,
}

impl JsonBookmarkRepository {
    pub fn new(document: Arc<JsonDocument>) -> Self {
        Self { document }
    }
}

#[async_trait]
impl BookmarkRepository for JsonBookmarkRepository {
    async fn load_all(&self) -> Result<Vec<BookmarkRecord>> {
        self.document.read_all().await
    }

    async fn replace_all(&self, bookmarks: &[BookmarkRecord]) -> Result<()> {
        self.document.write_all(bookmarks).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BookmarkRecord>> {
        let bookmarks = self.load_all().await?;
        Ok(bookmarks.into_iter().find(|b| b.id == id))
    }

    async fn save(&self, bookmark: &BookmarkRecord) -> Result<()> {
        let mut bookmarks = self.load_all().await?;
        match bookmarks.iter_mut().find(|b| b.id == bookmark.id) {
            Some(existing) => *existing = bookmark.clone(),
            None => bookmarks.push(bookmark.clone()),
        }
        self.replace_all(&bookmarks).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut bookmarks = self.load_all().await?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        self.replace_all(&bookmarks).await?;
        Ok(true)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load_all().await?.len())
    }
}

/// Collection repository over a JSON document
pub struct JsonCollectionRepository {
    document: Arc<JsonDocument>,
}

impl JsonCollectionRepository {
    pub fn new(document: Arc<JsonDocument>) -> Self {
        Self { document }
    }
}

#[async_trait]
impl CollectionRepository for JsonCollectionRepository {
    async fn load_all(&self) -> Result<Vec<Collection>> {
        self.document.read_all().await
    }

    async fn replace_all(&self, collections: &[Collection]) -> Result<()> {
        self.document.write_all(collections).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Collection>> {
        let collections = self.load_all().await?;
        Ok(collections.into_iter().find(|c| c.id == id))
    }

    async fn save(&self, collection: &Collection) -> Result<()> {
        let mut collections = self.load_all().await?;
        match collections.iter_mut().find(|c| c.id == collection.id) {
            Some(existing) => *existing = collection.clone(),
            None => collections.push(collection.clone()),
        }
        self.replace_all(&collections).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut collections = self.load_all().await?;
        let before = collections.len();
        collections.retain(|c| c.id != id);
        if collections.len() == before {
            return Ok(false);
        }
        self.replace_all(&collections).await?;
        Ok(true)
    }
}
