//! Bookmark Import and Export Module
//!
//! Reads bookmarks from the formats users actually have lying around and
//! writes them back out again.
//!
//! # Formats
//! - Netscape bookmark HTML, as exported by every major browser
//! - Linkshelf JSON (a bare record array or a full export document)
//! - Plain text with URLs scattered through it

use crate::metadata::decode_entities;
use linkshelf_core::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::debug;

/// Version written into export documents
pub const EXPORT_VERSION: u32 = 1;

static URL_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)https?://[^\s<>"'`]+"#).expect("valid url pattern"));

/// Netscape structure tokens: folder headings, links and list boundaries
static NETSCAPE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>|<a\s([^>]*)>(.*?)</a>|(</dl>)|(<dl\b)")
        .expect("valid netscape pattern")
});

static TAG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("valid attribute pattern")
});

static INNER_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup pattern"));

/// Import source format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportFormat {
    Json,
    NetscapeHtml,
    PlainText,
}

/// One bookmark read from an import source, before it is merged into the
/// library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBookmark {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Name of the innermost folder the entry was filed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<i64>,
}

impl ImportedBookmark {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Full JSON export of a library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub exported_at: i64,
    #[serde(default)]
    pub bookmarks: Vec<BookmarkRecord>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

impl ExportDocument {
    pub fn new(bookmarks: Vec<BookmarkRecord>, collections: Vec<Collection>) -> Self {
        Self {
            version: EXPORT_VERSION,
            exported_at: now_millis(),
            bookmarks,
            collections,
        }
    }

    /// Flatten into import entries, turning collection references into
    /// folder names. References to collections missing from the document
    /// land at the top level.
    pub fn into_imported(self) -> Vec<ImportedBookmark> {
        let names: HashMap<String, String> = self
            .collections
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        self.bookmarks
            .into_iter()
            .map(|record| {
                let folder = match &record.collection_id {
                    CollectionId::Default => None,
                    CollectionId::Named(id) => names.get(id).cloned(),
                };
                ImportedBookmark {
                    url: record.url,
                    title: record.title,
                    description: record.description,
                    tags: record.tags,
                    folder,
                    icon: record.icon,
                    added_at: record.created_at,
                }
            })
            .collect()
    }
}

/// Guess the format of an import source from its content
pub fn detect_format(content: &str) -> ImportFormat {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return ImportFormat::Json;
    }

    let head = trimmed.to_ascii_lowercase();
    if head.contains("netscape-bookmark-file") || head.contains("<dl") {
        ImportFormat::NetscapeHtml
    } else {
        ImportFormat::PlainText
    }
}

/// Read every entry from `content`, whatever its format
pub fn parse_import(content: &str) -> Result<Vec<ImportedBookmark>> {
    let format = detect_format(content);
    debug!("Detected import format {:?}", format);

    match format {
        ImportFormat::Json => Ok(parse_json(content)?.into_imported()),
        ImportFormat::NetscapeHtml => parse_netscape_html(content),
        ImportFormat::PlainText => Ok(extract_urls(content)?
            .into_iter()
            .map(ImportedBookmark::from_url)
            .collect()),
    }
}

/// Pull every http(s) URL out of free text
///
/// Sentence punctuation stuck to the end of a URL is dropped, exact
/// duplicates are removed and first-seen order is kept.
pub fn extract_urls(text: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let urls: Vec<String> = URL_IN_TEXT
        .find_iter(text)
        .map(|m| trim_trailing_punctuation(m.as_str()))
        .filter(|url| !url.is_empty() && seen.insert(url.to_string()))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(ImportError::NoUrlsFound.into());
    }
    Ok(urls)
}

fn trim_trailing_punctuation(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            // Keep balanced brackets, as in wiki links
            ')' => url.matches('(').count() < url.matches(')').count(),
            ']' => url.matches('[').count() < url.matches(']').count(),
            _ => false,
        };
        if !strip {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

/// Parse a Netscape bookmark file
pub fn parse_netscape_html(html: &str) -> Result<Vec<ImportedBookmark>> {
    // One entry per open <DL>; named when it follows an <H3>
    let mut folders: Vec<Option<String>> = Vec::new();
    let mut pending_folder: Option<String> = None;
    let mut entries = Vec::new();

    for caps in NETSCAPE_TOKEN.captures_iter(html) {
        if let Some(heading) = caps.get(1) {
            pending_folder = Some(inner_text(heading.as_str()));
        } else if let Some(attributes) = caps.get(2) {
            let text = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            let folder = folders.iter().rev().find_map(|f| f.clone());
            if let Some(entry) = parse_anchor(attributes.as_str(), text, folder) {
                entries.push(entry);
            }
        } else if caps.get(4).is_some() {
            folders.pop();
        } else if caps.get(5).is_some() {
            folders.push(pending_folder.take().filter(|name| !name.is_empty()));
        }
    }

    if entries.is_empty() {
        return Err(ImportError::NoUrlsFound.into());
    }

    debug!("Parsed {} bookmark(s) from Netscape HTML", entries.len());
    Ok(entries)
}

fn parse_anchor(attributes: &str, text: &str, folder: Option<String>) -> Option<ImportedBookmark> {
    let attributes: HashMap<String, String> = TAG_ATTRIBUTE
        .captures_iter(attributes)
        .filter_map(|caps| {
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
            Some((caps[1].to_ascii_lowercase(), decode_entities(value.as_str())))
        })
        .collect();

    let url = attributes.get("href")?.trim().to_string();
    let lower = url.to_ascii_lowercase();
    if url.is_empty() || lower.starts_with("place:") || lower.starts_with("javascript:") {
        return None;
    }

    let tags = attributes
        .get("tags")
        .map(|raw| {
            let mut tags: Vec<String> = Vec::new();
            for tag in raw.split(',').map(|t| t.trim().to_lowercase()) {
                if !tag.is_empty() && !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags
        })
        .unwrap_or_default();

    let added_at = attributes
        .get("add_date")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map(|secs| secs.saturating_mul(1000));

    let icon = attributes
        .get("icon")
        .or_else(|| attributes.get("icon_uri"))
        .filter(|icon| !icon.is_empty())
        .cloned();

    Some(ImportedBookmark {
        url,
        title: inner_text(text),
        description: String::new(),
        tags,
        folder,
        icon,
        added_at,
    })
}

fn inner_text(fragment: &str) -> String {
    decode_entities(INNER_MARKUP.replace_all(fragment, "").trim())
}

/// Parse Linkshelf JSON: a bare array of records or an export document
pub fn parse_json(content: &str) -> Result<ExportDocument> {
    let value: serde_json::Value = serde_json::from_str(content.trim_start_matches('\u{feff}'))
        .map_err(|e| ImportError::Parse {
            details: e.to_string(),
        })?;

    let parse_error = |e: serde_json::Error| ImportError::Parse {
        details: e.to_string(),
    };

    match value {
        serde_json::Value::Array(_) => {
            let bookmarks: Vec<BookmarkRecord> =
                serde_json::from_value(value).map_err(parse_error)?;
            Ok(ExportDocument {
                bookmarks,
                ..ExportDocument::default()
            })
        }
        serde_json::Value::Object(_) => Ok(serde_json::from_value(value).map_err(parse_error)?),
        _ => Err(ImportError::UnsupportedFormat {
            details: "expected a JSON array or object".to_string(),
        }
        .into()),
    }
}

/// Serialize bookmarks and collections as a pretty JSON export document
pub fn export_json(bookmarks: &[BookmarkRecord], collections: &[Collection]) -> Result<String> {
    let document = ExportDocument::new(bookmarks.to_vec(), collections.to_vec());
    let json = serde_json::to_string_pretty(&document).map_err(SystemError::from)?;
    Ok(json)
}

/// Write a Netscape bookmark file
///
/// Each named collection becomes a folder. Bookmarks in the default
/// collection, or in a collection that no longer exists, go at the top level.
pub fn export_netscape_html(bookmarks: &[BookmarkRecord], collections: &[Collection]) -> String {
    let mut out = String::from(
        "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
         <!-- This is an automatically generated file.\n     \
         It will be read and overwritten.\n     \
         DO NOT EDIT! -->\n\
         <META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
         <TITLE>Bookmarks</TITLE>\n\
         <H1>Bookmarks</H1>\n\
         <DL><p>\n",
    );

    let known: HashSet<&str> = collections.iter().map(|c| c.id.as_str()).collect();

    for collection in collections {
        out.push_str(&format!(
            "    <DT><H3 ADD_DATE=\"{}\">{}</H3>\n    <DL><p>\n",
            collection.created_at / 1000,
            escape_html(&collection.name)
        ));
        for bookmark in bookmarks
            .iter()
            .filter(|b| b.collection_id.as_str() == collection.id && !b.collection_id.is_default())
        {
            write_anchor(&mut out, bookmark, "        ");
        }
        out.push_str("    </DL><p>\n");
    }

    for bookmark in bookmarks.iter().filter(|b| match &b.collection_id {
        CollectionId::Default => true,
        CollectionId::Named(id) => !known.contains(id.as_str()),
    }) {
        write_anchor(&mut out, bookmark, "    ");
    }

    out.push_str("</DL><p>\n");
    out
}

fn write_anchor(out: &mut String, bookmark: &BookmarkRecord, indent: &str) {
    let mut attributes = format!("HREF=\"{}\"", escape_html(&bookmark.url));
    if let Some(created_at) = bookmark.created_at {
        attributes.push_str(&format!(" ADD_DATE=\"{}\"", created_at / 1000));
    }
    if let Some(updated_at) = bookmark.updated_at {
        attributes.push_str(&format!(" LAST_MODIFIED=\"{}\"", updated_at / 1000));
    }
    if let Some(icon) = &bookmark.icon {
        attributes.push_str(&format!(" ICON_URI=\"{}\"", escape_html(icon)));
    }
    if !bookmark.tags.is_empty() {
        attributes.push_str(&format!(" TAGS=\"{}\"", escape_html(&bookmark.tags.join(","))));
    }

    let title = if bookmark.title.is_empty() {
        &bookmark.url
    } else {
        &bookmark.title
    };
    out.push_str(&format!("{}<DT><A {}>{}</A>\n", indent, attributes, escape_html(title)));
}

/// Escape text for an HTML attribute or element body
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
