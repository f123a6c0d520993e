//! Content extractor: one DOM subtree in, structured `Content` out
//!
//! Deterministic and free of I/O. The subtree arrives serialized so the
//! extractor always works on its own copy; the noise filter runs on that
//! copy before anything is collected.

use std::collections::HashSet;

use scraper::Html;
use url::Url;

use crate::ScrapeConfig;
use crate::dom::sel;
use crate::model::{Content, Image, Link};
use crate::noise::strip_noise;
use crate::utils::{resolve_url, sanitize_text, truncate};

/// Schemes and pseudo-hrefs excluded from the link set (but not from raw
/// text).
fn excluded_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:")
}

/// Extract structured content from a serialized subtree, resolving every
/// href/src against `base`.
pub fn extract(subtree_html: &str, base: &Url, cfg: &ScrapeConfig) -> Content {
    let mut frag = Html::parse_fragment(subtree_html);
    strip_noise(&mut frag, &cfg.noise_patterns);

    let text = sanitize_text(&frag.root_element().text().collect::<Vec<_>>().join(" "));

    let mut headings = Vec::new();
    for h in frag.select(&sel("h1, h2, h3, h4, h5, h6")) {
        let t = sanitize_text(&h.text().collect::<Vec<_>>().join(" "));
        if !t.is_empty() {
            headings.push(t);
        }
    }

    // Links deduplicated by resolved href, first occurrence wins.
    let mut links = Vec::new();
    let mut seen_hrefs = HashSet::new();
    for a in frag.select(&sel("a[href]")) {
        let Some(href) = a.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || excluded_href(href) {
            continue;
        }
        let Some(abs) = resolve_url(href, base) else {
            continue;
        };
        if !seen_hrefs.insert(abs.clone()) {
            continue;
        }
        let label = sanitize_text(&a.text().collect::<Vec<_>>().join(" "));
        links.push(Link {
            href: abs,
            text: truncate(&label, cfg.max_link_text_len),
        });
    }

    let mut images = Vec::new();
    let mut seen_srcs = HashSet::new();
    for img in frag.select(&sel("img[src]")) {
        let Some(src) = img.value().attr("src").map(str::trim) else {
            continue;
        };
        let Some(abs) = resolve_url(src, base) else {
            continue;
        };
        if !seen_srcs.insert(abs.clone()) {
            continue;
        }
        let alt = img.value().attr("alt").unwrap_or("");
        images.push(Image {
            src: abs,
            alt: truncate(&sanitize_text(alt), cfg.max_alt_text_len),
        });
    }

    // Nested lists are flattened: every <li> becomes one item of the list
    // element it is queried under, so no item is ever lost.
    let mut lists = Vec::new();
    for list in frag.select(&sel("ul, ol")) {
        let items: Vec<String> = list
            .select(&sel("li"))
            .map(|li| sanitize_text(&li.text().collect::<Vec<_>>().join(" ")))
            .filter(|t| !t.is_empty())
            .collect();
        if !items.is_empty() {
            lists.push(items);
        }
    }

    let mut tables = Vec::new();
    for table in frag.select(&sel("table")) {
        let mut rows = Vec::new();
        for tr in table.select(&sel("tr")) {
            let row: Vec<String> = tr
                .select(&sel("td, th"))
                .map(|cell| sanitize_text(&cell.text().collect::<Vec<_>>().join(" ")))
                .filter(|t| !t.is_empty())
                .collect();
            if !row.is_empty() {
                rows.push(row);
            }
        }
        if !rows.is_empty() {
            tables.push(rows);
        }
    }

    Content {
        text,
        headings,
        links,
        images,
        lists,
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    fn cfg() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    #[test]
    fn collects_text_and_headings_in_order() {
        let html = "<section><h2>First</h2><p>some   body\ntext</p><h3>Second</h3></section>";
        let content = extract(html, &base(), &cfg());
        assert_eq!(content.text, "First some body text Second");
        assert_eq!(content.headings, vec!["First", "Second"]);
    }

    #[test]
    fn links_are_absolute_and_deduplicated() {
        let html = r##"<div>
            <a href="/about">About</a>
            <a href="/about">About again</a>
            <a href="page2">Next page</a>
            <a href="#top">Top</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:x@example.com">Mail</a>
        </div>"##;
        let content = extract(html, &base(), &cfg());
        let hrefs: Vec<&str> = content.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec!["https://example.com/about", "https://example.com/blog/page2"]
        );
        assert_eq!(content.links[0].text, "About");
    }

    #[test]
    fn images_resolve_and_truncate_alt() {
        let long_alt = "a".repeat(300);
        let html = format!(r#"<div><img src="pic.png" alt="{long_alt}"><img src="pic.png" alt="dup"></div>"#);
        let content = extract(&html, &base(), &cfg());
        assert_eq!(content.images.len(), 1);
        assert_eq!(content.images[0].src, "https://example.com/blog/pic.png");
        assert!(content.images[0].alt.len() > cfg().max_alt_text_len);
    }

    #[test]
    fn nested_lists_lose_no_items() {
        let html = "<ul><li>one</li><li>two<ul><li>two-a</li></ul></li></ul>";
        let content = extract(html, &base(), &cfg());
        // Outer list carries every item, the inner list repeats its own.
        assert_eq!(content.lists[0], vec!["one", "two two-a", "two-a"]);
        assert_eq!(content.lists[1], vec!["two-a"]);
    }

    #[test]
    fn tables_become_rows_of_cells() {
        let html = "<table><tr><th>h1</th><th>h2</th></tr><tr><td>a</td><td>b</td></tr></table>";
        let content = extract(html, &base(), &cfg());
        assert_eq!(
            content.tables,
            vec![vec![vec!["h1".to_string(), "h2".to_string()], vec![
                "a".to_string(),
                "b".to_string()
            ]]]
        );
    }

    #[test]
    fn noise_is_stripped_before_extraction() {
        let html = r#"<div><script>var x;</script><div class="popup">modal</div><p>kept</p></div>"#;
        let content = extract(html, &base(), &cfg());
        assert_eq!(content.text, "kept");
    }

    #[test]
    fn extraction_is_idempotent() {
        let html = r#"<article><h1>T</h1><p>body</p><a href="/x">x</a><img src="i.png" alt="i"></article>"#;
        let first = extract(html, &base(), &cfg());
        let second = extract(html, &base(), &cfg());
        assert_eq!(first, second);
    }
}
