//! Bookmark Deduplication Module
//!
//! Collapses a list of bookmarks into at most one record per canonical URL.
//!
//! When two records share a key, the record filed in a named collection
//! beats one that only lives in the default collection. Otherwise the more
//! recently updated record wins, and an exact tie keeps the record seen first.

use linkshelf_core::*;
use crate::canonical::{canonical_key, strip_ref_param_reporting};
use std::collections::HashMap;
use tracing::debug;

/// Which of two colliding records to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepExisting,
    TakeIncoming,
}

/// Decide between the first-seen record and a later one with the same key
pub fn resolve_conflict(existing: &BookmarkRecord, incoming: &BookmarkRecord) -> Resolution {
    let existing_default = existing.collection_id.is_default();
    let incoming_default = incoming.collection_id.is_default();

    match (existing_default, incoming_default) {
        (true, false) => Resolution::TakeIncoming,
        (false, true) => Resolution::KeepExisting,
        _ if incoming.updated_at_or_zero() > existing.updated_at_or_zero() => {
            Resolution::TakeIncoming
        }
        _ => Resolution::KeepExisting,
    }
}

/// Deduplicate records by canonical URL
///
/// Output follows the order in which each distinct key was first seen.
/// Every surviving record has its `url` rewritten to the canonical key and
/// missing timestamps filled with the current time.
pub fn dedupe(records: Vec<BookmarkRecord>) -> Vec<BookmarkRecord> {
    dedupe_at(records, now_millis())
}

/// [`dedupe`] with an explicit "current time" for timestamp backfill
pub fn dedupe_at(records: Vec<BookmarkRecord>, now: i64) -> Vec<BookmarkRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut chosen: Vec<(String, BookmarkRecord)> = Vec::new();

    for record in records {
        let key = canonical_key(&record.url);
        match slots.get(&key).copied() {
            None => {
                slots.insert(key.clone(), chosen.len());
                chosen.push((key, record));
            }
            Some(slot) => {
                let existing = &chosen[slot].1;
                if resolve_conflict(existing, &record) == Resolution::TakeIncoming {
                    debug!("Duplicate of {} replaces {}", key, existing.id);
                    chosen[slot].1 = record;
                } else {
                    debug!("Duplicate of {} dropped: {}", key, record.id);
                }
            }
        }
    }

    chosen
        .into_iter()
        .map(|(key, mut record)| {
            record.url = key;
            record.backfill_timestamps(now);
            record
        })
        .collect()
}

/// Remove the `ref` parameter from every record's stored URL
///
/// Returns how many records actually carried a `ref` parameter.
pub fn strip_ref_params(records: &mut [BookmarkRecord]) -> usize {
    let mut stripped = 0;
    for record in records.iter_mut() {
        let (url, removed) = strip_ref_param_reporting(&record.url);
        if removed {
            stripped += 1;
        }
        record.url = url;
    }
    stripped
}

/// Ref-strip then deduplicate, counting both effects separately
///
/// `ref_stripped_count` is measured before deduplication; `removed_count`
/// is the size difference afterwards, so one record may appear in both.
pub fn dedupe_report(records: Vec<BookmarkRecord>) -> DedupeReport {
    dedupe_report_at(records, now_millis())
}

/// [`dedupe_report`] with an explicit "current time"
pub fn dedupe_report_at(mut records: Vec<BookmarkRecord>, now: i64) -> DedupeReport {
    let ref_stripped_count = strip_ref_params(&mut records);
    let before = records.len();
    let deduped = dedupe_at(records, now);
    let removed_count = before - deduped.len();

    DedupeReport {
        deduped,
        removed_count,
        ref_stripped_count,
    }
}

/// Find a record that would be a duplicate of `url`
pub fn find_duplicate<'a>(records: &'a [BookmarkRecord], url: &str) -> Option<&'a BookmarkRecord> {
    let key = canonical_key(url);
    records.iter().find(|r| canonical_key(&r.url) == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, url: &str, collection: &str, updated_at: Option<i64>) -> BookmarkRecord {
        BookmarkRecord {
            id: id.to_string(),
            url: url.to_string(),
            title: String::new(),
            description: String::new(),
            icon: None,
            image: None,
            tags: vec![],
            collection_id: CollectionId::from(collection),
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn test_named_collection_beats_default() {
        let records = vec![
            record("a", "http://a.com", "default", Some(1)),
            record("b", "http://a.com/", "work", Some(1)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[0].url, "https://a.com/");
    }

    #[test]
    fn test_named_existing_is_kept_over_newer_default() {
        let records = vec![
            record("a", "https://a.com/x", "work", Some(1)),
            record("b", "https://a.com/x/", "default", Some(50)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn test_newer_record_wins_between_named() {
        let records = vec![
            record("old", "https://a.com/x", "work", Some(5)),
            record("new", "https://www.a.com/x", "reading", Some(10)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out[0].id, "new");
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        let records = vec![
            record("first", "https://a.com/", "default", Some(7)),
            record("second", "https://a.com/#x", "default", Some(7)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out[0].id, "first");
    }

    #[test]
    fn test_missing_timestamp_counts_as_zero() {
        let records = vec![
            record("none", "https://a.com/", "default", None),
            record("one", "https://a.com/", "default", Some(1)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out[0].id, "one");
    }

    #[test]
    fn test_timestamps_backfilled() {
        let out = dedupe_at(vec![record("a", "https://a.com/", "default", None)], 42);
        assert_eq!(out[0].created_at, Some(42));
        assert_eq!(out[0].updated_at, Some(42));
    }

    #[test]
    fn test_output_follows_first_occurrence() {
        let records = vec![
            record("1", "https://b.com/", "default", Some(1)),
            record("2", "https://a.com/", "default", Some(1)),
            record("3", "https://b.com/?utm_source=x", "work", Some(1)),
        ];

        let out = dedupe_at(records, 100);
        let ids: Vec<&str> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn test_malformed_urls_never_merge_with_each_other() {
        let records = vec![
            record("1", "http://exa mple.com", "default", Some(1)),
            record("2", " http://exa  mple.com ", "default", Some(1)),
        ];

        let out = dedupe_at(records, 100);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "http://exa mple.com");
    }

    #[test]
    fn test_dedupe_report_counts() {
        let records = vec![
            record("1", "https://a.com/?ref=hn", "default", Some(1)),
            record("2", "https://a.com/", "default", Some(2)),
            record("3", "https://b.com/?ref=x&y=1", "default", Some(1)),
            record("4", "https://c.com/", "default", Some(1)),
        ];

        let report = dedupe_report_at(records, 100);
        assert_eq!(report.removed_count, 1);
        assert_eq!(report.ref_stripped_count, 2);
        assert_eq!(report.deduped.len(), 3);
        assert_eq!(report.deduped[0].id, "2");
        assert_eq!(report.deduped[1].url, "https://b.com/?y=1");
    }

    #[test]
    fn test_find_duplicate() {
        let records = vec![record("1", "https://www.a.com/page/", "default", Some(1))];
        assert_eq!(
            find_duplicate(&records, "a.com/page?ref=z").map(|r| r.id.as_str()),
            Some("1")
        );
        assert!(find_duplicate(&records, "https://a.com/other").is_none());
    }

    #[test]
    fn test_empty_input() {
        assert!(dedupe(vec![]).is_empty());
        let report = dedupe_report(vec![]);
        assert_eq!(report.removed_count, 0);
        assert_eq!(report.ref_stripped_count, 0);
    }
}
