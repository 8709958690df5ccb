use thiserror::Error;

/// Persistence related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {document}: {source}")]
    Serialization {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt document {path}: {details}")]
    CorruptDocument { path: String, details: String },
}

/// Errors raised while fetching a page for metadata
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL for fetching: {url}")]
    InvalidUrl { url: String },

    #[error("Network error for {url}: {details}")]
    Network { url: String, details: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Content too large for {url}: {size} bytes > {limit} bytes")]
    ContentTooLarge { url: String, size: u64, limit: u64 },

    #[error("Request timed out: {url}")]
    Timeout { url: String },
}

/// Errors raised while reading an import source
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No URLs found")]
    NoUrlsFound,

    #[error("Unsupported import format: {details}")]
    UnsupportedFormat { details: String },

    #[error("Failed to parse import data: {details}")]
    Parse { details: String },
}

/// Bookmark library operation errors
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Bookmark not found: {bookmark_id}")]
    BookmarkNotFound { bookmark_id: String },

    #[error("Collection not found: {collection_id}")]
    CollectionNotFound { collection_id: String },

    #[error("Collection already exists: {name}")]
    CollectionExists { name: String },

    #[error("Collection is reserved: {name}")]
    ReservedCollection { name: String },

    #[error("Bookmark URL is empty")]
    EmptyUrl,

    #[error("Collection name is empty")]
    EmptyCollectionName,
}

/// General system errors
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {details}")]
    Configuration { details: String },

    #[error("IO error: {source}")]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// Main error type for the application
#[derive(Debug, Error)]
pub enum LinkshelfError {
    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: StorageError,
    },

    #[error("Fetch error: {source}")]
    Fetch {
        #[from]
        source: FetchError,
    },

    #[error("Import error: {source}")]
    Import {
        #[from]
        source: ImportError,
    },

    #[error("Library error: {source}")]
    Library {
        #[from]
        source: LibraryError,
    },

    #[error("System error: {source}")]
    System {
        #[from]
        source: SystemError,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LinkshelfError>;
