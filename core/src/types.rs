use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Literal used on disk for the collection that represents "all bookmarks"
pub const DEFAULT_COLLECTION_ID: &str = "default";

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Reference from a bookmark to the collection it belongs to
///
/// The default collection is not a stored collection; it stands for
/// "all bookmarks" and is what a bookmark belongs to until it is filed
/// somewhere more specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CollectionId {
    #[default]
    Default,
    Named(String),
}

impl CollectionId {
    /// Create a reference to a named collection
    pub fn named(id: impl Into<String>) -> Self {
        Self::from(id.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, CollectionId::Default)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CollectionId::Default => DEFAULT_COLLECTION_ID,
            CollectionId::Named(id) => id,
        }
    }
}

impl From<String> for CollectionId {
    fn from(value: String) -> Self {
        if value == DEFAULT_COLLECTION_ID {
            CollectionId::Default
        } else {
            CollectionId::Named(value)
        }
    }
}

impl From<&str> for CollectionId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<CollectionId> for String {
    fn from(value: CollectionId) -> Self {
        match value {
            CollectionId::Default => DEFAULT_COLLECTION_ID.to_string(),
            CollectionId::Named(id) => id,
        }
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved bookmark as persisted in the bookmarks document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub collection_id: CollectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl BookmarkRecord {
    /// Create a new record in the default collection with fresh timestamps
    pub fn new(url: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            title: String::new(),
            description: String::new(),
            icon: None,
            image: None,
            tags: Vec::new(),
            collection_id: CollectionId::Default,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// `updated_at` with a missing value read as 0
    pub fn updated_at_or_zero(&self) -> i64 {
        self.updated_at.unwrap_or(0)
    }

    /// Refresh `updated_at`, never moving it backwards
    pub fn touch(&mut self) {
        let now = now_millis();
        self.updated_at = Some(match self.updated_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    /// Fill in missing timestamps with `now`
    pub fn backfill_timestamps(&mut self, now: i64) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        if self.updated_at.is_none() {
            self.updated_at = Some(now);
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Apply freshly extracted page metadata, keeping values already set by the user
    pub fn apply_metadata(&mut self, metadata: ExtractedMetadata) {
        if self.title.trim().is_empty() {
            self.title = metadata.title;
        }
        if self.description.trim().is_empty() {
            self.description = metadata.description;
        }
        if self.icon.is_none() {
            self.icon = metadata.icon;
        }
        if self.image.is_none() {
            self.image = metadata.image;
        }
    }
}

/// A user-created collection. The default collection is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now_millis(),
        }
    }

    /// Reference used by bookmarks filed in this collection
    pub fn collection_id(&self) -> CollectionId {
        CollectionId::named(self.id.clone())
    }
}

/// Metadata scraped from one HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub image: Option<String>,
}

/// Outcome of deduplicating a set of bookmarks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeReport {
    pub deduped: Vec<BookmarkRecord>,
    /// Records dropped as duplicates
    pub removed_count: usize,
    /// Records whose stored URL lost a `ref` query parameter
    pub ref_stripped_count: usize,
}
