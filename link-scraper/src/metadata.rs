//! Page Metadata Extraction Module
//!
//! Pulls title, description, icon and preview image out of raw HTML using
//! an ordered list of tag patterns, each one a fallback for the one before.
//! No HTML parser is involved and nothing here can fail: a missing tag
//! moves on to the next pattern, and an unusable page URL degrades to a
//! fixed fallback value.
//!
//! Attribute order matters: `property`/`name`/`rel` must come before
//! `content`/`href` inside the tag, as most generators write them.

use linkshelf_core::ExtractedMetadata;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use url::Url;

/// Title used when neither the page nor its URL yields anything
pub const UNTITLED: &str = "Untitled";

static OG_TITLE: LazyLock<Regex> = LazyLock::new(|| meta_pattern("property", "og:title"));
static TWITTER_TITLE: LazyLock<Regex> = LazyLock::new(|| meta_pattern("name", "twitter:title"));
static TITLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title pattern"));

static OG_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| meta_pattern("property", "og:description"));
static TWITTER_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| meta_pattern("name", "twitter:description"));
static META_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| meta_pattern("name", "description"));

static APPLE_TOUCH_ICON: LazyLock<Regex> = LazyLock::new(|| link_pattern("apple-touch-icon", None));
static PNG_ICON: LazyLock<Regex> = LazyLock::new(|| link_pattern("icon", Some("image/png")));
static SHORTCUT_ICON: LazyLock<Regex> = LazyLock::new(|| link_pattern("shortcut icon", None));
static ANY_ICON: LazyLock<Regex> = LazyLock::new(|| link_pattern("icon", None));

static OG_IMAGE: LazyLock<Regex> = LazyLock::new(|| meta_pattern("property", "og:image"));
static TWITTER_IMAGE: LazyLock<Regex> = LazyLock::new(|| meta_pattern("name", "twitter:image"));

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|#39|apos);").expect("valid entity pattern"));

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme pattern"));

/// `<meta {attr}="{value}" ... content="...">`
fn meta_pattern(attr: &str, value: &str) -> Regex {
    let pattern = format!(
        r#"(?i)<meta\b[^>]*\b{}\s*=\s*["']{}["'][^>]*\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        attr,
        regex::escape(value)
    );
    Regex::new(&pattern).expect("valid meta pattern")
}

/// `<link rel="{rel}" [type="{type}"] ... href="...">`
fn link_pattern(rel: &str, link_type: Option<&str>) -> Regex {
    let type_clause = link_type
        .map(|t| format!(r#"[^>]*\btype\s*=\s*["']{}["']"#, regex::escape(t)))
        .unwrap_or_default();
    let pattern = format!(
        r#"(?i)<link\b[^>]*\brel\s*=\s*["']{}["']{}[^>]*\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(rel),
        type_clause
    );
    Regex::new(&pattern).expect("valid link pattern")
}

/// First non-empty, trimmed capture of `re` in `html`
fn capture(re: &Regex, html: &str) -> Option<String> {
    re.captures_iter(html)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim().to_string())
        })
        .find(|value| !value.is_empty())
}

/// Try each pattern in order and return the first hit
fn first_match(patterns: &[&Regex], html: &str) -> Option<String> {
    patterns.iter().find_map(|re| capture(re, html))
}

/// Decode the small fixed set of named entities pages commonly use in titles
///
/// Anything outside `&amp; &lt; &gt; &quot; &#39; &apos;` is left untouched.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            match &caps[1] {
                "amp" => "&",
                "lt" => "<",
                "gt" => ">",
                "quot" => "\"",
                _ => "'",
            }
            .to_string()
        })
        .into_owned()
}

/// Hostname of `url` without a leading `www.`
fn display_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

/// `scheme://host[:port]` of `url`, if it has one
fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Make `href` absolute against a site origin
///
/// Relative paths resolve against the origin root, not the page's own
/// directory: `icons/a.png` on `https://x.com/blog/post` becomes
/// `https://x.com/icons/a.png`.
pub fn resolve_url(href: &str, origin: &str) -> String {
    let href = href.trim();
    if SCHEME_PREFIX.is_match(href) {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("{}{}", origin, href)
    } else {
        format!("{}/{}", origin, href)
    }
}

/// Page title: og:title, twitter:title, `<title>`, then the host name
pub fn extract_title(html: &str, url: &str) -> String {
    first_match(&[&OG_TITLE, &TWITTER_TITLE, &TITLE_ELEMENT], html)
        .map(|title| decode_entities(&title))
        .or_else(|| display_host(url))
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Page description: og:description, twitter:description, then
/// `<meta name="description">`. Empty when none is present.
pub fn extract_description(html: &str) -> String {
    first_match(&[&OG_DESCRIPTION, &TWITTER_DESCRIPTION, &META_DESCRIPTION], html)
        .map(|description| decode_entities(&description))
        .unwrap_or_default()
}

/// Site icon, falling back to `{origin}/favicon.ico`
///
/// Only `None` when `url` itself has no usable origin.
pub fn extract_icon(html: &str, url: &str) -> Option<String> {
    let origin = origin_of(url)?;
    let icon = first_match(
        &[&APPLE_TOUCH_ICON, &PNG_ICON, &SHORTCUT_ICON, &ANY_ICON],
        html,
    )
    .map(|href| resolve_url(&href, &origin))
    .unwrap_or_else(|| format!("{}/favicon.ico", origin));
    Some(icon)
}

/// Preview image: og:image, then twitter:image
pub fn extract_image(html: &str, url: &str) -> Option<String> {
    let origin = origin_of(url)?;
    first_match(&[&OG_IMAGE, &TWITTER_IMAGE], html).map(|href| resolve_url(&href, &origin))
}

/// Run every extractor over one document
pub fn extract_metadata(html: &str, url: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        title: extract_title(html, url),
        description: extract_description(html),
        icon: extract_icon(html, url),
        image: extract_image(html, url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_og_title_with_entities() {
        let html = r#"<meta property="og:title" content="Hello &amp; World">"#;
        assert_eq!(extract_title(html, "https://x.com"), "Hello & World");
    }

    #[test]
    fn test_title_fallback_order() {
        let html = r#"<html><head>
            <title>Plain Title</title>
            <meta name="twitter:title" content="Twitter Title">
        </head></html>"#;
        assert_eq!(extract_title(html, "https://x.com"), "Twitter Title");

        let html = r#"<html><head><TITLE>  Plain Title  </TITLE></head></html>"#;
        assert_eq!(extract_title(html, "https://x.com"), "Plain Title");
    }

    #[test]
    fn test_og_title_beats_everything() {
        let html = r#"<title>Plain</title>
            <meta name="twitter:title" content="Twitter">
            <meta property="og:title" content="Open Graph">"#;
        assert_eq!(extract_title(html, "https://x.com"), "Open Graph");
    }

    #[test]
    fn test_title_falls_back_to_host() {
        let html = "<html><head></head></html>";
        assert_eq!(extract_title(html, "https://sub.example.com"), "sub.example.com");
        assert_eq!(extract_title(html, "https://www.example.com/page"), "example.com");
    }

    #[test]
    fn test_title_untitled_for_bad_url() {
        assert_eq!(extract_title("", "not a url"), UNTITLED);
        assert_eq!(extract_title("", "mailto:me@example.com"), UNTITLED);
    }

    #[test]
    fn test_empty_title_element_is_skipped() {
        let html = "<title>   </title>";
        assert_eq!(extract_title(html, "https://example.org/"), "example.org");
    }

    #[test]
    fn test_title_element_may_contain_angle_brackets() {
        assert_eq!(extract_title("<title>a < b</title>", "https://x.com"), "a < b");
        let html = "<title>\n  Vec<T> docs\n</title><body><title>Other</title>";
        assert_eq!(extract_title(html, "https://x.com"), "Vec<T> docs");
    }

    #[test]
    fn test_blank_meta_content_falls_through() {
        let html = r#"<meta property="og:title" content="  ">
            <meta name="twitter:title" content="Twitter Title">"#;
        assert_eq!(extract_title(html, "https://x.com"), "Twitter Title");

        let html = r#"<meta property="og:title" content="  "><title>Plain</title>"#;
        assert_eq!(extract_title(html, "https://x.com"), "Plain");

        let html = r#"<meta property="og:description" content=""><meta name="description" content="Generic">"#;
        assert_eq!(extract_description(html), "Generic");
    }

    #[test]
    fn test_content_before_property_is_not_matched() {
        let html = r#"<meta content="Reversed" property="og:title"><title>Fallback</title>"#;
        assert_eq!(extract_title(html, "https://x.com"), "Fallback");
    }

    #[test]
    fn test_single_quoted_attributes() {
        let html = r#"<meta property='og:title' content='It "works"'>"#;
        assert_eq!(extract_title(html, "https://x.com"), "It \"works\"");
    }

    #[test]
    fn test_decode_entities_fixed_set() {
        assert_eq!(
            decode_entities("&lt;b&gt; &quot;q&quot; &#39;s&apos;"),
            "<b> \"q\" 's'"
        );
        // Unknown entities stay as written
        assert_eq!(decode_entities("a&nbsp;b &copy; &#169;"), "a&nbsp;b &copy; &#169;");
        // One pass only
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_description_fallback_order() {
        let html = r#"<meta name="description" content="Generic">
            <meta name="twitter:description" content="Twitter">"#;
        assert_eq!(extract_description(html), "Twitter");

        let html = r#"<meta name="description" content="It&#39;s generic">"#;
        assert_eq!(extract_description(html), "It's generic");

        assert_eq!(extract_description("<html></html>"), "");
    }

    #[test]
    fn test_icon_fallback_order() {
        let html = r#"
            <link rel="icon" href="/any.ico">
            <link rel="shortcut icon" href="/shortcut.ico">
            <link rel="icon" type="image/png" href="/icon.png">
            <link rel="apple-touch-icon" href="/apple.png">"#;
        assert_eq!(
            extract_icon(html, "https://x.com/page").as_deref(),
            Some("https://x.com/apple.png")
        );

        let html = r#"<link rel="icon" href="/any.ico"><link rel="icon" type="image/png" href="/icon.png">"#;
        assert_eq!(
            extract_icon(html, "https://x.com").as_deref(),
            Some("https://x.com/icon.png")
        );

        let html = r#"<link rel="icon" href="/any.ico"><link rel="shortcut icon" href="s.ico">"#;
        assert_eq!(
            extract_icon(html, "https://x.com").as_deref(),
            Some("https://x.com/s.ico")
        );
    }

    #[test]
    fn test_icon_defaults_to_favicon() {
        assert_eq!(
            extract_icon("<html></html>", "https://x.com").as_deref(),
            Some("https://x.com/favicon.ico")
        );
        assert_eq!(
            extract_icon("", "http://localhost:8080/a/b").as_deref(),
            Some("http://localhost:8080/favicon.ico")
        );
        assert_eq!(extract_icon("", "not a url"), None);
    }

    #[test]
    fn test_extract_image() {
        assert_eq!(extract_image("<html></html>", "https://x.com"), None);

        let html = r#"<meta name="twitter:image" content="//cdn.x.com/t.png">"#;
        assert_eq!(
            extract_image(html, "https://x.com").as_deref(),
            Some("https://cdn.x.com/t.png")
        );

        let html = r#"<meta name="twitter:image" content="/t.png">
            <meta property="og:image" content="https://img.x.com/og.png">"#;
        assert_eq!(
            extract_image(html, "https://x.com").as_deref(),
            Some("https://img.x.com/og.png")
        );
    }

    #[test]
    fn test_resolve_url() {
        let origin = "https://x.com";
        assert_eq!(resolve_url("https://y.com/a.png", origin), "https://y.com/a.png");
        assert_eq!(resolve_url("data:image/png;base64,AA", origin), "data:image/png;base64,AA");
        assert_eq!(resolve_url("//cdn.y.com/a.png", origin), "https://cdn.y.com/a.png");
        assert_eq!(resolve_url("/a.png", origin), "https://x.com/a.png");
        // Relative to the origin root, not the page path
        assert_eq!(resolve_url("img/a.png", origin), "https://x.com/img/a.png");
    }

    #[test]
    fn test_extract_metadata() {
        let html = r#"<html><head>
            <title>Rust Programming Language</title>
            <meta name="description" content="A language empowering everyone">
            <meta property="og:image" content="/social.png">
        </head></html>"#;

        let metadata = extract_metadata(html, "https://www.rust-lang.org/learn");
        assert_eq!(metadata.title, "Rust Programming Language");
        assert_eq!(metadata.description, "A language empowering everyone");
        assert_eq!(metadata.icon.as_deref(), Some("https://www.rust-lang.org/favicon.ico"));
        assert_eq!(metadata.image.as_deref(), Some("https://www.rust-lang.org/social.png"));
    }
}
