//! Bookmark Manager for Linkshelf
//!
//! This module provides the bookmark library and the URL logic it relies on
//! to tell two bookmarks apart.
//!
//! # Features
//! - URL canonicalization for duplicate detection
//! - Deduplication of bookmark sets by canonical URL
//! - Client-side search with tag filters and relevance ranking
//! - Bookmark CRUD, tags and collections over the data store
//! - Import merge and store-wide deduplication

pub mod canonical;
pub mod dedup;
pub mod search;
pub mod library;

pub use canonical::{canonical_key, canonicalize, strip_ref_param, urls_match};
pub use dedup::{dedupe, dedupe_report, find_duplicate, resolve_conflict, Resolution};
pub use search::{SearchHit, SearchQuery, SearchSortOrder};
pub use library::*;

// Re-export commonly used types
pub use linkshelf_core::*;
