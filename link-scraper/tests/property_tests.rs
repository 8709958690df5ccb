// Property: metadata extraction is total. Any HTML and any URL produce a
// non-empty title, and whatever text a page puts in its title tags (escaped
// with the common entities) comes back out unescaped.
//
// Property: a Netscape file written by the exporter reads back with the same
// URLs, titles and folders.

use linkshelf_core::*;
use link_scraper::import::escape_html;
use link_scraper::*;
use proptest::prelude::*;

// Strategy for generating page URLs, including unusable ones
fn arb_page_url() -> impl Strategy<Value = String> {
    prop_oneof![
        "https://[a-z]{3,10}\\.[a-z]{2,4}/[a-z0-9/_-]{0,30}",
        "http://www\\.[a-z]{3,10}\\.com",
        "[a-z:/ ]{0,20}",
    ]
}

// Strategy for generating title text with characters that need escaping
fn arb_title_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 &<>\"']{0,40}[a-zA-Z0-9]"
}

fn arb_tag() -> impl Strategy<Value = String> {
    "[a-z]{2,8}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_extraction_is_total(html in ".{0,300}", url in arb_page_url()) {
        let metadata = extract_metadata(&html, &url);
        prop_assert!(!metadata.title.is_empty());
    }

    #[test]
    fn prop_icon_present_for_http_urls(
        html in ".{0,200}",
        url in "https://[a-z]{3,10}\\.[a-z]{2,4}/[a-z]{0,10}",
    ) {
        let icon = extract_icon(&html, &url);
        prop_assert!(icon.is_some());
    }

    #[test]
    fn prop_escaped_title_decodes(title in arb_title_text()) {
        let html = format!(
            "<html><head><meta property=\"og:title\" content=\"{}\"></head></html>",
            escape_html(&title)
        );
        prop_assert_eq!(extract_title(&html, "https://example.com"), title);
    }

    #[test]
    fn prop_title_element_decodes(title in arb_title_text()) {
        let html = format!("<title>{}</title>", escape_html(&title));
        prop_assert_eq!(extract_title(&html, "https://example.com"), title);
    }

    #[test]
    fn prop_extract_urls_finds_every_url(
        hosts in prop::collection::vec("[a-z]{3,10}", 1..6),
        filler in "[a-z ]{0,20}",
    ) {
        let urls: Vec<String> = hosts.iter().map(|h| format!("https://{}.com/page", h)).collect();
        let text = urls.iter()
            .map(|u| format!("{} {}.", filler, u))
            .collect::<Vec<_>>()
            .join("\n");

        let found = extract_urls(&text).unwrap();
        for url in &urls {
            prop_assert!(found.contains(url));
        }
        // Never more than the distinct URLs in the text
        let mut distinct = urls.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(found.len(), distinct.len());
    }

    #[test]
    fn prop_netscape_export_reads_back(
        entries in prop::collection::vec(
            (
                "https://[a-z]{3,10}\\.com/[a-z0-9]{0,10}",
                arb_title_text(),
                prop::collection::vec(arb_tag(), 0..3),
                0usize..3,
            ),
            1..12,
        ),
    ) {
        let collections = vec![Collection::new("Work & Play"), Collection::new("<Reading>")];

        let bookmarks: Vec<BookmarkRecord> = entries
            .iter()
            .map(|(url, title, tags, slot)| {
                let mut record = BookmarkRecord::new(url.clone());
                record.title = title.clone();
                record.tags = tags.clone();
                record.collection_id = match slot {
                    0 => CollectionId::Default,
                    n => collections[n - 1].collection_id(),
                };
                record
            })
            .collect();

        let html = export_netscape_html(&bookmarks, &collections);
        let imported = parse_netscape_html(&html).unwrap();
        prop_assert_eq!(imported.len(), bookmarks.len());

        for record in &bookmarks {
            let folder = collections
                .iter()
                .find(|c| c.collection_id() == record.collection_id)
                .map(|c| c.name.clone());
            let found = imported.iter().any(|entry| {
                entry.url == record.url && entry.title == record.title && entry.folder == folder
            });
            prop_assert!(found, "missing {} in export", record.url);
        }
    }
}
