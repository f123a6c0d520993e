//! DOM facade over the `scraper` backend
//!
//! The extraction modules (noise filter, section detector, content
//! extractor) depend on this module rather than on `scraper` directly, so
//! the concrete DOM library stays a single-point decision.

use scraper::{Html, Selector};
use url::Url;

use crate::ScrapeConfig;
use crate::noise::strip_noise;

/// Compile a CSS selector known to be valid at compile time.
pub(crate) fn sel(selector: &str) -> Selector {
    // All call sites pass literal selector strings.
    #[allow(clippy::unwrap_used)]
    Selector::parse(selector).unwrap()
}

/// A captured page: parsed DOM tree plus the resolved base URL every
/// relative href/src is resolved against.
///
/// The noise filter runs once at parse time, before any tier of section
/// detection sees the tree, so noise never influences tier selection.
pub struct PageDom {
    doc: Html,
    base: Url,
}

impl PageDom {
    pub fn parse(html: &str, base: Url, cfg: &ScrapeConfig) -> Self {
        let mut doc = Html::parse_document(html);
        strip_noise(&mut doc, &cfg.noise_patterns);
        Self { doc, base }
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Whether any element matches the given literal selector.
    pub fn has_match(&self, selector: &str) -> bool {
        self.doc.select(&sel(selector)).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ScrapeConfig {
        ScrapeConfig::default()
    }

    #[test]
    fn parse_applies_noise_filter() {
        let base = Url::parse("https://example.com/").unwrap();
        let dom = PageDom::parse(
            "<body><script>x()</script><main>hello</main></body>",
            base,
            &cfg(),
        );
        assert!(dom.has_match("main"));
        assert!(!dom.has_match("script"));
    }

    #[test]
    fn noisy_landmark_does_not_satisfy_matches() {
        // A cookie banner wrapped in <main> must not count as main content.
        let base = Url::parse("https://example.com/").unwrap();
        let dom = PageDom::parse(
            r#"<body><main class="cookie-consent">Accept cookies</main><div>text</div></body>"#,
            base,
            &cfg(),
        );
        assert!(!dom.has_match("main"));
    }
}
