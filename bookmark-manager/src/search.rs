//! Bookmark Search Module
//!
//! Client-side search over the in-memory bookmark set.
//!
//! Query syntax: whitespace separated terms, all of which must match
//! somewhere in title, URL, description or tags. Terms written as `#rust`
//! or `tag:rust` only match tags.

use linkshelf_core::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchSortOrder {
    /// Sort by relevance score (default), newest first on ties
    #[default]
    Relevance,
    /// Most recently updated first
    RecentFirst,
    /// Least recently updated first
    OldestFirst,
    /// Title A-Z
    TitleAsc,
    /// Title Z-A
    TitleDesc,
}

/// A parsed search request
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Free-text terms, lower-cased
    pub terms: Vec<String>,
    /// Tags every result must carry, lower-cased
    pub tags: Vec<String>,
    /// Restrict to one collection; `Default` means all bookmarks
    pub collection: CollectionId,
    pub sort: SearchSortOrder,
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Parse a query string typed into the search box
    pub fn parse(input: &str) -> Self {
        let mut query = Self::default();
        for word in input.split_whitespace() {
            let lower = word.to_lowercase();
            let tag = lower
                .strip_prefix('#')
                .or_else(|| lower.strip_prefix("tag:"))
                .map(str::to_string);
            match tag {
                Some(tag) if !tag.is_empty() => query.tags.push(tag),
                Some(_) => {}
                None => query.terms.push(lower),
            }
        }
        query
    }

    pub fn in_collection(mut self, collection: CollectionId) -> Self {
        self.collection = collection;
        self
    }

    pub fn sorted_by(mut self, sort: SearchSortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether the query has no text or tag constraints
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.tags.is_empty()
    }

    /// Check whether a record satisfies every constraint of the query
    pub fn matches(&self, record: &BookmarkRecord) -> bool {
        if !self.collection.is_default() && record.collection_id != self.collection {
            return false;
        }

        if !self.tags.iter().all(|tag| record.has_tag(tag)) {
            return false;
        }

        let title = record.title.to_lowercase();
        let url = record.url.to_lowercase();
        let description = record.description.to_lowercase();

        self.terms.iter().all(|term| {
            title.contains(term)
                || url.contains(term)
                || description.contains(term)
                || record.tags.iter().any(|t| t.to_lowercase().contains(term))
        })
    }
}

/// A scored search hit
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a BookmarkRecord,
    /// Relevance score (0.0 - 1.0)
    pub relevance_score: f32,
}

/// Run a query against a set of records
pub fn search<'a>(records: &'a [BookmarkRecord], query: &SearchQuery) -> Vec<SearchHit<'a>> {
    let mut hits: Vec<SearchHit<'a>> = records
        .iter()
        .filter(|r| query.matches(r))
        .map(|record| SearchHit {
            record,
            relevance_score: calculate_relevance(&query.terms, record),
        })
        .collect();

    sort_hits(&mut hits, query.sort);

    if let Some(limit) = query.limit {
        hits.truncate(limit);
    }

    hits
}

/// Calculate relevance score for a record
fn calculate_relevance(terms: &[String], record: &BookmarkRecord) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }

    let phrase = terms.join(" ");
    let title = record.title.to_lowercase();
    let url = record.url.to_lowercase();
    let description = record.description.to_lowercase();

    let mut score = 0.0f32;

    // Exact title match
    if title == phrase {
        score += 1.0;
    }
    // Title contains the whole query
    else if title.contains(&phrase) {
        score += 0.8;
    }
    // Title words match
    else {
        let matching = terms.iter().filter(|t| title.contains(t.as_str())).count();
        if matching > 0 {
            score += 0.5 * (matching as f32 / terms.len() as f32);
        }
    }

    if record.tags.iter().any(|t| terms.iter().any(|term| t.to_lowercase() == *term)) {
        score += 0.4;
    }

    if terms.iter().any(|t| url.contains(t.as_str())) {
        score += 0.3;
    }

    if terms.iter().any(|t| description.contains(t.as_str())) {
        score += 0.2;
    }

    score.min(1.0)
}

fn sort_hits(hits: &mut [SearchHit<'_>], order: SearchSortOrder) {
    match order {
        SearchSortOrder::Relevance => {
            hits.sort_by(|a, b| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.record.updated_at_or_zero().cmp(&a.record.updated_at_or_zero()))
            });
        }
        SearchSortOrder::RecentFirst => {
            hits.sort_by(|a, b| b.record.updated_at_or_zero().cmp(&a.record.updated_at_or_zero()));
        }
        SearchSortOrder::OldestFirst => {
            hits.sort_by(|a, b| a.record.updated_at_or_zero().cmp(&b.record.updated_at_or_zero()));
        }
        SearchSortOrder::TitleAsc => {
            hits.sort_by(|a, b| a.record.title.to_lowercase().cmp(&b.record.title.to_lowercase()));
        }
        SearchSortOrder::TitleDesc => {
            hits.sort_by(|a, b| b.record.title.to_lowercase().cmp(&a.record.title.to_lowercase()));
        }
    }
}
