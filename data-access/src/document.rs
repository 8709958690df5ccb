//! Whole-file JSON documents
//!
//! Each document holds one JSON array that is always read in full and
//! replaced in full. Writes land in a temporary sibling first and are then
//! renamed over the target.

use linkshelf_core::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// File names used inside the data directory
pub const BOOKMARKS_FILE: &str = "bookmarks.json";
pub const COLLECTIONS_FILE: &str = "collections.json";

#[derive(Debug)]
enum Location {
    File(PathBuf),
    Memory(RwLock<Option<String>>),
}

/// A JSON array document on disk or in memory
#[derive(Debug)]
pub struct JsonDocument {
    name: String,
    location: Location,
    write_lock: Mutex<()>,
}

impl JsonDocument {
    /// Document backed by a file. The file does not need to exist yet.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            location: Location::File(path),
            write_lock: Mutex::new(()),
        }
    }

    /// Document kept in memory (for testing)
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: Location::Memory(RwLock::new(None)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory(_) => None,
        }
    }

    /// Read every item. A document that does not exist yet is empty.
    pub async fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(Vec::new());
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            warn!("Document {} could not be parsed: {}", self.name, e);
            StorageError::CorruptDocument {
                path: self.name.clone(),
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Replace the whole document with `items`
    pub async fn write_all<T: Serialize>(&self, items: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(items).map_err(|e| StorageError::Serialization {
            document: self.name.clone(),
            source: e,
        })?;

        let _guard = self.write_lock.lock().await;
        match &self.location {
            Location::File(path) => write_replacing(path, &json).await?,
            Location::Memory(slot) => *slot.write().await = Some(json),
        }

        debug!("Wrote {} item(s) to {}", items.len(), self.name);
        Ok(())
    }

    async fn read_raw(&self) -> Result<Option<String>> {
        match &self.location {
            Location::File(path) => match tokio::fs::read_to_string(path).await {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(io_error(path, e)),
            },
            Location::Memory(slot) => Ok(slot.read().await.clone()),
        }
    }
}

/// Write `contents` next to `path` and rename it into place
async fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_error(path, e))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> LinkshelfError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_document_starts_empty() {
        let doc = JsonDocument::memory("bookmarks");
        let items: Vec<BookmarkRecord> = doc.read_all().await.unwrap();
        assert!(items.is_empty());
        assert!(doc.path().is_none());
    }

    #[tokio::test]
    async fn test_memory_document_replaces_whole_content() {
        let doc = JsonDocument::memory("collections");
        doc.write_all(&[Collection::new("a"), Collection::new("b")]).await.unwrap();
        doc.write_all(&[Collection::new("c")]).await.unwrap();

        let items: Vec<Collection> = doc.read_all().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "c");
    }
}
