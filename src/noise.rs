//! Noise filter: drops non-content nodes before extraction
//!
//! Operates on a working copy of the tree, never on a caller's captured
//! page. Removal happens ahead of section detection so that, e.g., a
//! cookie banner marked up as `<main>` cannot satisfy the landmark tier.

use scraper::node::Element;
use scraper::{ElementRef, Html};

/// Tags removed unconditionally.
const NOISE_TAGS: [&str; 4] = ["script", "style", "noscript", "iframe"];

/// Detach every noise node from `doc`: blocked tags, elements whose class
/// or id contains a denylisted substring, `aria-hidden` elements, and
/// elements hidden by inline style.
pub fn strip_noise(doc: &mut Html, patterns: &[String]) {
    let doomed: Vec<_> = doc
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let el = ElementRef::wrap(node)?;
            is_noise(el.value(), patterns).then(|| node.id())
        })
        .collect();

    for id in doomed {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn is_noise(el: &Element, patterns: &[String]) -> bool {
    NOISE_TAGS.contains(&el.name())
        || el.attr("aria-hidden") == Some("true")
        || inline_style_hides(el.attr("style"))
        || denylisted(el, patterns)
}

fn denylisted(el: &Element, patterns: &[String]) -> bool {
    let class = el.attr("class").unwrap_or("").to_ascii_lowercase();
    let id = el.attr("id").unwrap_or("").to_ascii_lowercase();
    patterns
        .iter()
        .any(|p| class.contains(p.as_str()) || id.contains(p.as_str()))
}

fn inline_style_hides(style: Option<&str>) -> bool {
    let Some(style) = style else {
        return false;
    };
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::sel;

    fn patterns() -> Vec<String> {
        crate::ScrapeConfig::default().noise_patterns
    }

    fn text_of(doc: &Html) -> String {
        crate::utils::sanitize_text(&doc.root_element().text().collect::<Vec<_>>().join(" "))
    }

    #[test]
    fn removes_script_style_iframe() {
        let mut doc = Html::parse_document(
            "<body><script>a</script><style>b</style><noscript>c</noscript>\
             <iframe src=\"x\"></iframe><p>keep</p></body>",
        );
        strip_noise(&mut doc, &patterns());
        assert_eq!(text_of(&doc), "keep");
    }

    #[test]
    fn removes_denylisted_class_and_id_substrings() {
        let mut doc = Html::parse_document(
            r#"<body>
                <div class="cookie-banner">consent</div>
                <div id="newsletter-popup">subscribe</div>
                <div class="site-ads">buy</div>
                <article>real content</article>
            </body>"#,
        );
        strip_noise(&mut doc, &patterns());
        assert_eq!(text_of(&doc), "real content");
    }

    #[test]
    fn removes_hidden_elements() {
        let mut doc = Html::parse_document(
            r#"<body>
                <div aria-hidden="true">invisible</div>
                <div style="display: none">gone</div>
                <div style="visibility:hidden">gone too</div>
                <div style="display:block">visible</div>
            </body>"#,
        );
        strip_noise(&mut doc, &patterns());
        assert_eq!(text_of(&doc), "visible");
    }

    #[test]
    fn header_tag_survives_substring_matching() {
        // "header" contains the letters "ad"; the denylist must only match
        // its own configured substrings.
        let mut doc = Html::parse_document("<body><header>site head</header></body>");
        strip_noise(&mut doc, &patterns());
        assert!(doc.select(&sel("header")).next().is_some());
    }
}
