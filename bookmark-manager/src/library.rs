//! Bookmark Library Module
//!
//! The persistent bookmark collection: CRUD, tags, collections, import
//! merge and store-wide deduplication on top of the repositories.
//!
//! Every mutation is a read-modify-write of a whole document, so mutations
//! are serialized through one lock. Reads go straight to the repositories.

use crate::canonical::{canonical_key, strip_ref_param};
use crate::dedup::{dedupe_report, find_duplicate};
use crate::search::{search, SearchQuery};
use data_access::{BookmarkRepository, CollectionRepository, DataStore};
use link_scraper::ImportedBookmark;
use linkshelf_core::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Collection names users may not take
const RESERVED_COLLECTION_NAMES: [&str; 2] = ["default", "all"];

/// Input for a new bookmark
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBookmark {
    pub url: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub collection_id: CollectionId,
}

impl NewBookmark {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn in_collection(mut self, collection_id: CollectionId) -> Self {
        self.collection_id = collection_id;
        self
    }

    /// Fill empty fields from scraped page metadata
    pub fn with_metadata(mut self, metadata: ExtractedMetadata) -> Self {
        if self.title.trim().is_empty() {
            self.title = metadata.title;
        }
        if self.description.trim().is_empty() {
            self.description = metadata.description;
        }
        self.icon = self.icon.or(metadata.icon);
        self.image = self.image.or(metadata.image);
        self
    }
}

/// Partial update of a stored bookmark; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub collection_id: Option<CollectionId>,
}

/// Result of adding a bookmark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new record was stored
    Added(BookmarkRecord),
    /// A record with the same canonical URL was already stored; it is
    /// returned unchanged
    AlreadyExists(BookmarkRecord),
}

impl AddOutcome {
    pub fn record(&self) -> &BookmarkRecord {
        match self {
            AddOutcome::Added(record) | AddOutcome::AlreadyExists(record) => record,
        }
    }

    pub fn into_record(self) -> BookmarkRecord {
        match self {
            AddOutcome::Added(record) | AddOutcome::AlreadyExists(record) => record,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added(_))
    }
}

/// Counts from an import merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub added: usize,
    pub skipped_duplicates: usize,
    pub collections_created: usize,
}

/// Number of bookmarks carrying a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// An owned search result
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBookmark {
    pub bookmark: BookmarkRecord,
    /// Relevance score (0.0 - 1.0)
    pub relevance_score: f32,
}

/// Bookmark library over the bookmark and collection repositories
pub struct BookmarkLibrary {
    bookmarks: Arc<dyn BookmarkRepository>,
    collections: Arc<dyn CollectionRepository>,
    write_lock: Mutex<()>,
}

impl BookmarkLibrary {
    pub fn new(
        bookmarks: Arc<dyn BookmarkRepository>,
        collections: Arc<dyn CollectionRepository>,
    ) -> Self {
        Self {
            bookmarks,
            collections,
            write_lock: Mutex::new(()),
        }
    }

    /// Library over both repositories of a data store
    pub fn from_store(store: &DataStore) -> Self {
        Self::new(store.bookmarks(), store.collections())
    }

    // =========================================================================
    // Bookmarks
    // =========================================================================

    /// Add a bookmark unless its canonical URL is already stored
    ///
    /// The stored URL is the input with `ref` parameters removed; nothing
    /// else about it is rewritten.
    pub async fn add(&self, new: NewBookmark) -> Result<AddOutcome> {
        let url = new.url.trim();
        if url.is_empty() {
            return Err(LibraryError::EmptyUrl.into());
        }
        let url = strip_ref_param(url);

        let _guard = self.write_lock.lock().await;

        let existing = self.bookmarks.load_all().await?;
        if let Some(duplicate) = find_duplicate(&existing, &url) {
            debug!("{} is already stored as {}", url, duplicate.id);
            return Ok(AddOutcome::AlreadyExists(duplicate.clone()));
        }

        self.ensure_collection(&new.collection_id).await?;

        let mut record = BookmarkRecord::new(url);
        record.title = new.title.trim().to_string();
        record.description = new.description.trim().to_string();
        record.icon = new.icon;
        record.image = new.image;
        record.tags = normalize_tags(&new.tags);
        record.collection_id = new.collection_id;

        self.bookmarks.save(&record).await?;
        info!("Added bookmark {} ({})", record.id, record.url);
        Ok(AddOutcome::Added(record))
    }

    /// Look up a stored bookmark by canonical URL
    pub async fn find_by_url(&self, url: &str) -> Result<Option<BookmarkRecord>> {
        let records = self.bookmarks.load_all().await?;
        Ok(find_duplicate(&records, url).cloned())
    }

    pub async fn get(&self, id: &str) -> Result<Option<BookmarkRecord>> {
        self.bookmarks.get_by_id(id).await
    }

    /// Bookmarks in a collection, in stored order. `Default` lists everything.
    pub async fn list(&self, collection: &CollectionId) -> Result<Vec<BookmarkRecord>> {
        let records = self.bookmarks.load_all().await?;
        if collection.is_default() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| &r.collection_id == collection)
            .collect())
    }

    pub async fn count(&self) -> Result<usize> {
        self.bookmarks.count().await
    }

    pub async fn update(&self, id: &str, update: BookmarkUpdate) -> Result<BookmarkRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = self.require_bookmark(id).await?;

        if let Some(collection_id) = update.collection_id {
            self.ensure_collection(&collection_id).await?;
            record.collection_id = collection_id;
        }
        if let Some(title) = update.title {
            record.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            record.description = description.trim().to_string();
        }
        if let Some(icon) = update.icon {
            record.icon = Some(icon);
        }
        if let Some(image) = update.image {
            record.image = Some(image);
        }
        if let Some(tags) = update.tags {
            record.tags = normalize_tags(&tags);
        }
        record.touch();

        self.bookmarks.save(&record).await?;
        debug!("Updated bookmark {}", record.id);
        Ok(record)
    }

    /// Fill a stored bookmark's empty fields from page metadata
    pub async fn apply_metadata(&self, id: &str, metadata: ExtractedMetadata) -> Result<BookmarkRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = self.require_bookmark(id).await?;
        record.apply_metadata(metadata);
        record.touch();

        self.bookmarks.save(&record).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if !self.bookmarks.delete(id).await? {
            return Err(LibraryError::BookmarkNotFound {
                bookmark_id: id.to_string(),
            }
            .into());
        }
        info!("Deleted bookmark {}", id);
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub async fn add_tag(&self, id: &str, tag: &str) -> Result<BookmarkRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = self.require_bookmark(id).await?;
        if let Some(tag) = normalize_tag(tag) {
            if !record.tags.contains(&tag) {
                record.tags.push(tag);
                record.touch();
                self.bookmarks.save(&record).await?;
            }
        }
        Ok(record)
    }

    pub async fn remove_tag(&self, id: &str, tag: &str) -> Result<BookmarkRecord> {
        let _guard = self.write_lock.lock().await;

        let mut record = self.require_bookmark(id).await?;
        if let Some(tag) = normalize_tag(tag) {
            let before = record.tags.len();
            record.tags.retain(|t| !t.eq_ignore_ascii_case(&tag));
            if record.tags.len() != before {
                record.touch();
                self.bookmarks.save(&record).await?;
            }
        }
        Ok(record)
    }

    /// Every tag in use, most used first, then by name
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>> {
        let records = self.bookmarks.load_all().await?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &records {
            let tags: HashSet<String> = record.tags.iter().map(|t| t.to_lowercase()).collect();
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let mut counts: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        Ok(counts)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn collections(&self) -> Result<Vec<Collection>> {
        self.collections.load_all().await
    }

    pub async fn create_collection(&self, name: &str) -> Result<Collection> {
        let _guard = self.write_lock.lock().await;

        let existing = self.collections.load_all().await?;
        let name = validate_collection_name(name, &existing, None)?;

        let collection = Collection::new(name);
        self.collections.save(&collection).await?;
        info!("Created collection {} ({})", collection.name, collection.id);
        Ok(collection)
    }

    pub async fn rename_collection(&self, id: &str, name: &str) -> Result<Collection> {
        let _guard = self.write_lock.lock().await;

        let existing = self.collections.load_all().await?;
        let mut collection = existing
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| LibraryError::CollectionNotFound {
                collection_id: id.to_string(),
            })?;

        collection.name = validate_collection_name(name, &existing, Some(id))?;
        self.collections.save(&collection).await?;
        Ok(collection)
    }

    /// Delete a collection together with every bookmark filed in it
    ///
    /// Returns the number of bookmarks removed.
    pub async fn delete_collection(&self, id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        if self.collections.get_by_id(id).await?.is_none() {
            return Err(LibraryError::CollectionNotFound {
                collection_id: id.to_string(),
            }
            .into());
        }

        let target = CollectionId::named(id);
        let mut records = self.bookmarks.load_all().await?;
        let before = records.len();
        records.retain(|r| r.collection_id != target);
        let removed = before - records.len();

        if removed > 0 {
            self.bookmarks.replace_all(&records).await?;
        }
        self.collections.delete(id).await?;

        info!("Deleted collection {} and {} bookmark(s)", id, removed);
        Ok(removed)
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Merge imported entries into the library
    ///
    /// Folders map to collections by name (created on demand). Entries whose
    /// canonical URL is already stored, or appeared earlier in the batch, are
    /// skipped.
    pub async fn import(&self, entries: Vec<ImportedBookmark>) -> Result<ImportSummary> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.bookmarks.load_all().await?;
        let mut collections = self.collections.load_all().await?;

        let mut keys: HashSet<String> = records.iter().map(|r| canonical_key(&r.url)).collect();
        let mut by_name: HashMap<String, String> = collections
            .iter()
            .map(|c| (c.name.to_lowercase(), c.id.clone()))
            .collect();

        let mut summary = ImportSummary::default();
        let now = now_millis();

        for entry in entries {
            let url = entry.url.trim();
            if url.is_empty() {
                continue;
            }
            if !keys.insert(canonical_key(url)) {
                summary.skipped_duplicates += 1;
                continue;
            }

            let collection_id = match entry.folder.as_deref().map(str::trim) {
                Some(folder) if !folder.is_empty() && !is_reserved_name(folder) => {
                    let id = match by_name.get(&folder.to_lowercase()) {
                        Some(id) => id.clone(),
                        None => {
                            let collection = Collection::new(folder);
                            by_name.insert(folder.to_lowercase(), collection.id.clone());
                            let id = collection.id.clone();
                            collections.push(collection);
                            summary.collections_created += 1;
                            id
                        }
                    };
                    CollectionId::named(id)
                }
                _ => CollectionId::Default,
            };

            let mut record = BookmarkRecord::new(strip_ref_param(url));
            record.title = entry.title.trim().to_string();
            record.description = entry.description.trim().to_string();
            record.icon = entry.icon;
            record.tags = normalize_tags(&entry.tags);
            record.collection_id = collection_id;
            let added_at = entry.added_at.unwrap_or(now);
            record.created_at = Some(added_at);
            record.updated_at = Some(added_at);

            records.push(record);
            summary.added += 1;
        }

        if summary.collections_created > 0 {
            self.collections.replace_all(&collections).await?;
        }
        if summary.added > 0 {
            self.bookmarks.replace_all(&records).await?;
        }

        info!(
            "Imported {} bookmark(s), skipped {} duplicate(s), created {} collection(s)",
            summary.added, summary.skipped_duplicates, summary.collections_created
        );
        Ok(summary)
    }

    /// Strip `ref` parameters from every stored URL, collapse duplicates and
    /// write the result back
    pub async fn dedupe_by_url_in_place(&self) -> Result<DedupeReport> {
        let _guard = self.write_lock.lock().await;

        let records = self.bookmarks.load_all().await?;
        let report = dedupe_report(records);
        self.bookmarks.replace_all(&report.deduped).await?;

        info!(
            "Deduplicated store: removed {} duplicate(s), stripped ref from {} URL(s)",
            report.removed_count, report.ref_stripped_count
        );
        Ok(report)
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<ScoredBookmark>> {
        let records = self.bookmarks.load_all().await?;
        Ok(search(&records, query)
            .into_iter()
            .map(|hit| ScoredBookmark {
                bookmark: hit.record.clone(),
                relevance_score: hit.relevance_score,
            })
            .collect())
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    async fn require_bookmark(&self, id: &str) -> Result<BookmarkRecord> {
        self.bookmarks
            .get_by_id(id)
            .await?
            .ok_or_else(|| {
                LibraryError::BookmarkNotFound {
                    bookmark_id: id.to_string(),
                }
                .into()
            })
    }

    async fn ensure_collection(&self, collection_id: &CollectionId) -> Result<()> {
        match collection_id {
            CollectionId::Default => Ok(()),
            CollectionId::Named(id) => match self.collections.get_by_id(id).await? {
                Some(_) => Ok(()),
                None => Err(LibraryError::CollectionNotFound {
                    collection_id: id.clone(),
                }
                .into()),
            },
        }
    }
}

fn normalize_tag(tag: &str) -> Option<String> {
    let tag = tag.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Trim, lower-case and drop empty or repeated tags, keeping first-seen order
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().filter_map(|t| normalize_tag(t)) {
        if !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

fn is_reserved_name(name: &str) -> bool {
    RESERVED_COLLECTION_NAMES.contains(&name.to_lowercase().as_str())
}

/// Check a collection name against reserved words and existing names
///
/// `renaming` is the id of the collection being renamed, which may keep
/// its own name.
fn validate_collection_name(
    name: &str,
    existing: &[Collection],
    renaming: Option<&str>,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LibraryError::EmptyCollectionName.into());
    }
    if is_reserved_name(name) {
        return Err(LibraryError::ReservedCollection {
            name: name.to_string(),
        }
        .into());
    }

    let lower = name.to_lowercase();
    let taken = existing
        .iter()
        .filter(|c| Some(c.id.as_str()) != renaming)
        .any(|c| c.name.to_lowercase() == lower);
    if taken {
        return Err(LibraryError::CollectionExists {
            name: name.to_string(),
        }
        .into());
    }

    Ok(name.to_string())
}
