//! Fetch strategy selector: static result or browser render?
//!
//! Pure decision over the static pass's summary statistics. Every branch
//! produces a human-readable reason that travels to `meta.decisionReason`
//! so callers can see why a page was (not) rendered.

use serde::{Deserialize, Serialize};

use crate::ScrapeConfig;
use crate::dom::PageDom;
use crate::model::Section;

/// Caller-requested retrieval mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Auto,
    Static,
    Js,
}

/// Summary statistics of the static pass, consumed by `decide`.
#[derive(Debug, Clone, Copy)]
pub struct StaticSummary {
    pub fetch_failed: bool,
    pub total_text_len: usize,
    pub main_content_matched: bool,
}

impl StaticSummary {
    /// Summary for a static fetch that failed outright (network or parse).
    pub fn failed() -> Self {
        Self {
            fetch_failed: true,
            total_text_len: 0,
            main_content_matched: false,
        }
    }

    pub fn from_page(dom: &PageDom, sections: &[Section]) -> Self {
        Self {
            fetch_failed: false,
            // The threshold is a character count, so multi-byte text must
            // not be measured in bytes.
            total_text_len: sections
                .iter()
                .map(|s| s.content.text.chars().count())
                .sum(),
            main_content_matched: dom.has_match("main, article, [role=main]"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub use_render: bool,
    pub reason: String,
}

impl Decision {
    fn render(reason: impl Into<String>) -> Self {
        Self {
            use_render: true,
            reason: reason.into(),
        }
    }

    fn stay_static(reason: impl Into<String>) -> Self {
        Self {
            use_render: false,
            reason: reason.into(),
        }
    }
}

/// Ordered short-circuit policy; the first matching rule wins.
pub fn decide(summary: &StaticSummary, mode: FetchMode, cfg: &ScrapeConfig) -> Decision {
    match mode {
        FetchMode::Js => return Decision::render("js mode requested by caller"),
        FetchMode::Static => return Decision::stay_static("static mode requested by caller"),
        FetchMode::Auto => {}
    }

    if summary.fetch_failed {
        return Decision::render("static fetch failed, escalating to browser render");
    }
    if summary.total_text_len < cfg.text_threshold {
        return Decision::render(format!(
            "static text length {} below threshold {}",
            summary.total_text_len, cfg.text_threshold
        ));
    }
    if !summary.main_content_matched {
        return Decision::render("no main content landmark (main/article/[role=main]) found");
    }
    Decision::stay_static(format!(
        "static content sufficient ({} chars, main content present)",
        summary.total_text_len
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn cfg() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    fn summary(text_len: usize, main: bool) -> StaticSummary {
        StaticSummary {
            fetch_failed: false,
            total_text_len: text_len,
            main_content_matched: main,
        }
    }

    #[test]
    fn explicit_modes_short_circuit() {
        assert!(decide(&summary(10_000, true), FetchMode::Js, &cfg()).use_render);
        assert!(!decide(&StaticSummary::failed(), FetchMode::Static, &cfg()).use_render);
    }

    #[test]
    fn failed_fetch_escalates() {
        let decision = decide(&StaticSummary::failed(), FetchMode::Auto, &cfg());
        assert!(decision.use_render);
        assert!(decision.reason.contains("failed"));
    }

    #[test]
    fn low_text_escalates_regardless_of_landmarks() {
        let decision = decide(&summary(399, true), FetchMode::Auto, &cfg());
        assert!(decision.use_render);
        assert!(decision.reason.contains("below threshold"));
    }

    #[test]
    fn missing_main_content_escalates() {
        let decision = decide(&summary(5_000, false), FetchMode::Auto, &cfg());
        assert!(decision.use_render);
    }

    #[test]
    fn sufficient_static_content_stays_static() {
        let decision = decide(&summary(400, true), FetchMode::Auto, &cfg());
        assert!(!decision.use_render);
        assert!(!decision.reason.is_empty());
    }

    #[test]
    fn summary_reads_sections_and_landmarks() {
        let dom = PageDom::parse(
            "<body><article><p>words</p></article></body>",
            Url::parse("https://example.com/").unwrap(),
            &cfg(),
        );
        let sections = crate::detect::detect(&dom, &cfg());
        let s = StaticSummary::from_page(&dom, &sections);
        assert!(s.main_content_matched);
        assert_eq!(s.total_text_len, "words".len());
        assert!(!s.fetch_failed);
    }

    #[test]
    fn text_length_counts_characters_not_bytes() {
        let dom = PageDom::parse(
            "<body><article><p>héllo wörld €€€</p></article></body>",
            Url::parse("https://example.com/").unwrap(),
            &cfg(),
        );
        let sections = crate::detect::detect(&dom, &cfg());
        let s = StaticSummary::from_page(&dom, &sections);
        assert_eq!(s.total_text_len, "héllo wörld €€€".chars().count());
        assert!(s.total_text_len < "héllo wörld €€€".len());
    }
}
