//! Link Scraper module for Linkshelf
//!
//! Everything that reads bookmarks from the outside world: page metadata,
//! page downloads and bookmark files.
//!
//! # Features
//! - Title, description, icon and preview image extraction from raw HTML
//! - HTTP(S) page fetching with size, timeout and redirect limits
//! - Import from Netscape bookmark HTML, Linkshelf JSON and plain text
//! - Export to Linkshelf JSON and Netscape bookmark HTML

pub mod metadata;
pub mod fetcher;
pub mod import;

pub use metadata::{
    decode_entities, extract_description, extract_icon, extract_image, extract_metadata,
    extract_title, resolve_url,
};
pub use fetcher::{FetchSettings, FetchedMetadata, FetchedPage, MetadataFetcher};
pub use import::{
    detect_format, export_json, export_netscape_html, extract_urls, parse_import, parse_json,
    parse_netscape_html, ExportDocument, ImportFormat, ImportedBookmark,
};
