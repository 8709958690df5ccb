//! URL Canonicalization Module
//!
//! Turns raw URL strings into a stable form so that near-duplicates
//! (scheme, `www.` prefix, trailing slash, fragment, tracking parameters)
//! compare equal.
//!
//! Nothing here fails: input that cannot be parsed as a URL is handed back
//! trimmed, so it is still stored as the user typed it.

use std::sync::LazyLock;
use regex::Regex;
use url::Url;

/// Query parameter removed from stored URLs as well as comparison keys
const REF_PARAM: &str = "ref";

/// Prefix (case-insensitive) of campaign parameters dropped from comparison keys
const UTM_PREFIX: &str = "utm_";

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme pattern"));

/// `localhost:8080`, `example.com:81/path`: a port, not a scheme
static HOST_PORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:/?#]+:\d+(?:[/?#]|$)").expect("valid host:port pattern"));

/// Produce the comparison key for a raw URL
///
/// - trims whitespace; empty input is returned as given
/// - assumes `https://` when no scheme is present
/// - upgrades `http` to `https`
/// - lower-cases the host and drops leading `www.` labels
/// - drops the fragment, the `ref` parameter and every `utm_*` parameter
/// - removes one trailing slash from any path other than `/`
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    let Some(mut url) = parse_lenient(trimmed) else {
        return trimmed.to_string();
    };

    if url.scheme() == "http" {
        // Both schemes are special, so this cannot fail
        let _ = url.set_scheme("https");
    }

    if let Some(host) = url.host_str().map(str::to_string) {
        let mut bare = host.as_str();
        while let Some(rest) = bare.strip_prefix("www.") {
            // A bare "www." host has nothing left to keep
            if rest.is_empty() {
                break;
            }
            bare = rest;
        }
        if bare.len() != host.len() {
            let _ = url.set_host(Some(bare));
        }
    }

    url.set_fragment(None);

    retain_query_params(&mut url, |key| {
        key != REF_PARAM && !key.to_ascii_lowercase().starts_with(UTM_PREFIX)
    });
    if url.query().is_some() {
        let pairs = query_pairs_of(&url);
        set_query_pairs(&mut url, &pairs);
    }

    let path = url.path();
    if path != "/" && path.ends_with('/') {
        let trimmed_path = path[..path.len() - 1].to_string();
        url.set_path(&trimmed_path);
    }

    url.to_string()
}

/// Remove only the `ref` query parameter from a URL that is going to be stored
///
/// Host, path and every other parameter are kept as written.
pub fn strip_ref_param(raw: &str) -> String {
    strip_ref_param_reporting(raw).0
}

/// Like [`strip_ref_param`], also reporting whether a `ref` parameter was present
pub fn strip_ref_param_reporting(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (raw.to_string(), false);
    }

    let Some(mut url) = parse_lenient(trimmed) else {
        return (trimmed.to_string(), false);
    };

    let removed = retain_query_params(&mut url, |key| key != REF_PARAM);
    (url.to_string(), removed > 0)
}

/// Key used to detect duplicate bookmarks
pub fn canonical_key(raw: &str) -> String {
    canonicalize(&strip_ref_param(raw))
}

/// Check whether two URLs point at the same bookmark
pub fn urls_match(a: &str, b: &str) -> bool {
    canonical_key(a) == canonical_key(b)
}

/// Whether a string starts with a URI scheme such as `https:` or `mailto:`
///
/// `host:port` is not a scheme.
pub fn has_scheme(raw: &str) -> bool {
    SCHEME_PATTERN.is_match(raw) && !HOST_PORT_PATTERN.is_match(raw)
}

/// Parse a trimmed URL, assuming https for bare domains like `example.com`
fn parse_lenient(trimmed: &str) -> Option<Url> {
    if has_scheme(trimmed) {
        Url::parse(trimmed).ok()
    } else {
        Url::parse(&format!("https://{}", trimmed)).ok()
    }
}

/// Keep only query parameters whose decoded key passes `keep`, preserving
/// their order. Returns the number of parameters removed.
///
/// The query is left exactly as written when nothing is removed.
fn retain_query_params<F>(url: &mut Url, keep: F) -> usize
where
    F: Fn(&str) -> bool,
{
    if url.query().is_none() {
        return 0;
    }

    let pairs = query_pairs_of(url);
    let total = pairs.len();
    let kept: Vec<(String, String)> = pairs.into_iter().filter(|(k, _)| keep(k)).collect();
    let removed = total - kept.len();

    if removed > 0 {
        set_query_pairs(url, &kept);
    }
    removed
}

fn query_pairs_of(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Re-serialize the query from `pairs`; an empty list drops the `?`
fn set_query_pairs(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }
}
