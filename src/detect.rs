//! Section detector: partitions a page into ordered logical sections
//!
//! Three tiers, tried in order, first tier producing at least one
//! non-empty section wins:
//!   1. semantic landmarks (tags + ARIA role landmarks)
//!   2. heading-hierarchy grouping (h1–h3)
//!   3. full-page fallback over `<body>`, always kept even when empty
//!
//! The tiers are an explicit ordered list of functions so the priority
//! order stays auditable in isolation.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};

use scraper::node::Element;
use scraper::{ElementRef, Html};

use crate::ScrapeConfig;
use crate::dom::{PageDom, sel};
use crate::extract::extract;
use crate::model::{Section, SectionKind};
use crate::utils::truncate;

const LANDMARK_TAGS: [&str; 7] = [
    "header", "nav", "main", "article", "section", "aside", "footer",
];

const LANDMARK_ROLES: [&str; 6] = [
    "banner",
    "navigation",
    "main",
    "complementary",
    "contentinfo",
    "region",
];

const MAX_LABEL_LEN: usize = 100;
const DEDUP_PREFIX_CHARS: usize = 300;

type Tier = fn(&PageDom, &ScrapeConfig) -> Option<Vec<Section>>;

/// Detect sections. Never fails: when tiers 1–2 both come up empty the
/// full-page fallback section is returned, even if it is itself empty.
pub fn detect(dom: &PageDom, cfg: &ScrapeConfig) -> Vec<Section> {
    let tiers: [Tier; 2] = [tier_landmarks, tier_heading_groups];
    for tier in tiers {
        if let Some(sections) = tier(dom, cfg) {
            if !sections.is_empty() {
                return sections;
            }
        }
    }
    vec![tier_fallback(dom, cfg)]
}

fn is_landmark(el: &Element) -> bool {
    LANDMARK_TAGS.contains(&el.name())
        || el
            .attr("role")
            .is_some_and(|r| LANDMARK_ROLES.contains(&r.to_ascii_lowercase().as_str()))
}

/// One prospective section before extraction and filtering.
struct Candidate {
    kind: SectionKind,
    /// Serialized subtree handed to the content extractor.
    html: String,
    /// Serialized subtree kept as the section's raw markup.
    raw: String,
    /// Label to use when the content has no heading.
    hint: Option<String>,
    default_label: String,
}

/// Tier 1: semantic landmarks in document order. A landmark nested inside
/// another landmark still becomes its own section, but its subtree is
/// pruned out of the ancestor's extraction so content is never counted
/// twice.
fn tier_landmarks(dom: &PageDom, cfg: &ScrapeConfig) -> Option<Vec<Section>> {
    let mut candidates = Vec::new();
    for node in dom.document().root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if !is_landmark(el.value()) {
            continue;
        }
        let raw = el.html();
        candidates.push(Candidate {
            kind: SectionKind::Landmark,
            html: prune_nested_landmarks(&raw),
            raw,
            hint: el.value().attr("aria-label").map(str::to_string),
            default_label: el.value().name().to_ascii_uppercase(),
        });
    }
    if candidates.is_empty() {
        return None;
    }
    Some(assemble(candidates, dom, cfg))
}

/// Remove descendant landmarks from a serialized landmark subtree. The
/// first landmark in pre-order is the subtree root itself and is kept.
fn prune_nested_landmarks(subtree_html: &str) -> String {
    let mut frag = Html::parse_fragment(subtree_html);
    let mut root_seen = false;
    let doomed: Vec<_> = frag
        .tree
        .root()
        .descendants()
        .filter_map(|node| {
            let el = ElementRef::wrap(node)?;
            if !is_landmark(el.value()) {
                return None;
            }
            if !root_seen {
                root_seen = true;
                return None;
            }
            Some(node.id())
        })
        .collect();
    for id in doomed {
        if let Some(mut node) = frag.tree.get_mut(id) {
            node.detach();
        }
    }
    frag.root_element().inner_html()
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// Does this subtree start or contain a heading of equal-or-higher level?
/// Such a sibling ends the current group.
fn contains_boundary_heading(el: ElementRef, level: u8) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| heading_level(d.value().name()).is_some_and(|l| l <= level))
}

/// Collect the markup of one heading group: the heading itself plus every
/// following node, in document order, up to the next heading of
/// equal-or-higher level or the end of the document. When a heading's own
/// siblings run out the walk climbs to the parent's siblings, so a group
/// is not cut short by a wrapping container.
fn heading_group_html(el: ElementRef, level: u8) -> String {
    let mut html = el.html();
    let mut cursor = *el;
    'group: loop {
        for sibling in cursor.next_siblings() {
            if let Some(sib_el) = ElementRef::wrap(sibling) {
                if contains_boundary_heading(sib_el, level) {
                    break 'group;
                }
                html.push_str(&sib_el.html());
            } else if let Some(text) = sibling.value().as_text() {
                html.push_str(text);
            }
        }
        let Some(parent) = cursor.parent() else {
            break;
        };
        let Some(parent_el) = ElementRef::wrap(parent) else {
            break;
        };
        if matches!(parent_el.value().name(), "body" | "html") {
            break;
        }
        cursor = parent;
    }
    html
}

/// Tier 2: group content under h1–h3 headings. Each section spans from
/// its heading up to (excluding) the next heading of equal-or-higher
/// level, or the end of the document.
fn tier_heading_groups(dom: &PageDom, cfg: &ScrapeConfig) -> Option<Vec<Section>> {
    let headings: Vec<(ElementRef, u8)> = dom
        .document()
        .root_element()
        .descendants()
        .filter_map(|node| {
            let el = ElementRef::wrap(node)?;
            heading_level(el.value().name()).map(|level| (el, level))
        })
        .collect();
    if headings.is_empty() {
        return None;
    }

    let mut candidates = Vec::new();
    for (el, level) in headings {
        let html = heading_group_html(el, level);
        let label = crate::utils::sanitize_text(&el.text().collect::<Vec<_>>().join(" "));
        candidates.push(Candidate {
            kind: SectionKind::HeadingGroup,
            raw: html.clone(),
            html,
            hint: Some(label),
            default_label: el.value().name().to_ascii_uppercase(),
        });
    }
    Some(assemble(candidates, dom, cfg))
}

/// Tier 3: a single section wrapping the whole body. Kept even when empty
/// so callers get an explicit empty result rather than a missing one.
fn tier_fallback(dom: &PageDom, cfg: &ScrapeConfig) -> Section {
    let body_html = dom
        .document()
        .select(&sel("body"))
        .next()
        .map(|body| body.html())
        .unwrap_or_default();
    let content = extract(&body_html, dom.base_url(), cfg);
    Section {
        id: 0,
        kind: SectionKind::Fallback,
        label: "Page Content".to_string(),
        content,
        raw_html: truncate(&body_html, cfg.max_raw_html_len),
    }
}

fn text_signature(text: &str) -> u64 {
    let prefix: String = text.chars().take(DEDUP_PREFIX_CHARS).collect();
    let mut hasher = DefaultHasher::new();
    prefix.hash(&mut hasher);
    hasher.finish()
}

/// Extract candidates, drop the empty ones, suppress near-duplicates by
/// text-prefix signature, and assign contiguous ids in document order.
fn assemble(candidates: Vec<Candidate>, dom: &PageDom, cfg: &ScrapeConfig) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut seen = HashSet::new();
    for candidate in candidates {
        let content = extract(&candidate.html, dom.base_url(), cfg);
        if content.is_empty() {
            continue;
        }
        if !seen.insert(text_signature(&content.text)) {
            continue;
        }
        let label = content
            .headings
            .first()
            .cloned()
            .or(candidate.hint)
            .filter(|l| !l.is_empty())
            .unwrap_or(candidate.default_label);
        sections.push(Section {
            id: sections.len(),
            kind: candidate.kind,
            label: truncate(&label, MAX_LABEL_LEN),
            content,
            raw_html: truncate(&candidate.raw, cfg.max_raw_html_len),
        });
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page(html: &str) -> PageDom {
        PageDom::parse(
            html,
            Url::parse("https://example.com/").unwrap(),
            &ScrapeConfig::default(),
        )
    }

    fn cfg() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    #[test]
    fn landmark_tier_wins_in_document_order() {
        let dom = page(
            "<body>\
             <header><h1>Site</h1></header>\
             <main><p>main body</p></main>\
             <footer><p>fine print</p></footer>\
             </body>",
        );
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|s| s.kind == SectionKind::Landmark));
        assert_eq!(sections[0].label, "Site");
        assert_eq!(sections[1].content.text, "main body");
        let ids: Vec<usize> = sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn role_attribute_counts_as_landmark() {
        let dom = page(r#"<body><div role="main"><p>routed content</p></div></body>"#);
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::Landmark);
        assert_eq!(sections[0].content.text, "routed content");
    }

    #[test]
    fn nested_landmarks_are_disjoint() {
        let dom = page(
            r#"<body><main><p>outer text</p>
                 <a href="/outer">outer</a>
                 <section><a href="/inner">inner</a><p>inner text</p></section>
               </main></body>"#,
        );
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 2);

        let outer = &sections[0];
        let inner = &sections[1];
        assert!(outer.content.text.contains("outer text"));
        assert!(!outer.content.text.contains("inner text"));
        assert!(inner.content.text.contains("inner text"));

        let outer_hrefs: Vec<&str> = outer.content.links.iter().map(|l| l.href.as_str()).collect();
        let inner_hrefs: Vec<&str> = inner.content.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(outer_hrefs, vec!["https://example.com/outer"]);
        assert_eq!(inner_hrefs, vec!["https://example.com/inner"]);
    }

    #[test]
    fn heading_tier_spans_to_equal_or_higher_heading() {
        let dom = page(
            "<body>\
             <h2>Alpha</h2><p>alpha body</p><h3>Alpha sub</h3><p>sub body</p>\
             <h2>Beta</h2><p>beta body</p>\
             </body>",
        );
        let sections = detect(&dom, &cfg());
        assert!(sections.iter().all(|s| s.kind == SectionKind::HeadingGroup));
        assert_eq!(sections[0].label, "Alpha");
        assert!(sections[0].content.text.contains("alpha body"));
        assert!(sections[0].content.text.contains("sub body"));
        assert!(!sections[0].content.text.contains("beta body"));

        let beta = sections.iter().find(|s| s.label == "Beta").unwrap();
        assert!(beta.content.text.contains("beta body"));
        assert!(!beta.content.text.contains("alpha body"));
    }

    #[test]
    fn heading_group_extends_past_its_wrapping_container() {
        let dom = page(
            "<body>\
             <div><h2>Alpha</h2><p>alpha body</p></div>\
             <p>trailing note</p>\
             <div><h2>Beta</h2><p>beta body</p></div>\
             </body>",
        );
        let sections = detect(&dom, &cfg());
        let alpha = sections.iter().find(|s| s.label == "Alpha").unwrap();
        assert!(alpha.content.text.contains("alpha body"));
        assert!(alpha.content.text.contains("trailing note"));
        assert!(!alpha.content.text.contains("beta body"));

        let beta = sections.iter().find(|s| s.label == "Beta").unwrap();
        assert!(beta.content.text.contains("beta body"));
        assert!(!beta.content.text.contains("trailing note"));
    }

    #[test]
    fn fallback_tier_wraps_full_body() {
        let dom = page("<body><div><p>just a div soup page</p></div></body>");
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::Fallback);
        assert_eq!(sections[0].label, "Page Content");
        assert_eq!(sections[0].content.text, "just a div soup page");
    }

    #[test]
    fn fallback_is_kept_even_when_empty() {
        let dom = page("<body></body>");
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, SectionKind::Fallback);
        assert!(sections[0].content.is_empty());
    }

    #[test]
    fn empty_landmarks_are_dropped() {
        let dom = page("<body><nav></nav><main><p>content</p></main></body>");
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content.text, "content");
    }

    #[test]
    fn duplicate_sections_are_suppressed() {
        let dom = page(
            "<body><section><p>same words here</p></section>\
             <section><p>same words here</p></section></body>",
        );
        let sections = detect(&dom, &cfg());
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn raw_html_is_truncated_to_limit() {
        let mut cfg = cfg();
        cfg.max_raw_html_len = 40;
        let dom = page("<body><main><p>some content that is long enough</p></main></body>");
        let sections = detect(&dom, &cfg);
        assert!(sections[0].raw_html.len() > 40);
        assert!(sections[0].raw_html.ends_with("..."));
    }
}
