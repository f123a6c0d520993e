//! Result data model
//!
//! The `ResultDocument` is the sole externally visible artifact of one
//! `scrape` call. It is built incrementally by the engine and serialized
//! as camelCase JSON for the serving layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the page content was retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Static,
    Rendered,
}

/// Which detection tier produced a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Landmark,
    HeadingGroup,
    Fallback,
}

/// A deduplicated link with its resolved absolute href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// An image with its resolved absolute source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
}

/// Structured content extracted from one section subtree.
///
/// All hrefs and srcs are absolute by the time they land here; relative
/// URLs are resolved against the page base during extraction, never later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub text: String,
    pub headings: Vec<String>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub lists: Vec<Vec<String>>,
    pub tables: Vec<Vec<Vec<String>>>,
}

impl Content {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One logical content unit of the page.
///
/// Ids are contiguous from zero in source-document order within one
/// extraction pass; a re-detection after an interaction produces a fresh
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: usize,
    pub kind: SectionKind,
    pub label: String,
    pub content: Content,
    pub raw_html: String,
}

/// The interaction the controller attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionKind {
    ClickTab,
    ClickLoadMore,
    Scroll,
    Paginate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionOutcome {
    Applied,
    SkippedNotVisible,
    SkippedCrossDomain,
    TimedOut,
}

/// Audit-trail entry for one attempted interaction. Appended, never
/// mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub kind: InteractionKind,
    pub target: String,
    pub outcome: InteractionOutcome,
    pub depth: usize,
}

/// Full interaction audit for one scrape, including the trail of pages
/// visited through pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionLog {
    pub records: Vec<InteractionRecord>,
    pub total_scrolls: u32,
    pub pages: Vec<String>,
}

/// Pipeline phase a recoverable failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPhase {
    Fetch,
    Parse,
    Interact,
    Engine,
}

/// A recoverable failure, downgraded to a record on the result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedError {
    pub phase: ErrorPhase,
    pub message: String,
}

/// Page-level metadata from the best available page capture.
/// Missing values stay empty; they are never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub language: String,
    pub canonical_url: String,
    pub retrieval_mode: RetrievalMode,
    /// Human-readable explanation of the static-vs-render decision.
    pub decision_reason: String,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            language: String::new(),
            canonical_url: String::new(),
            retrieval_mode: RetrievalMode::Static,
            decision_reason: String::new(),
        }
    }
}

/// The immutable output of one `scrape` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDocument {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub meta: PageMeta,
    pub sections: Vec<Section>,
    pub interactions: InteractionLog,
    pub errors: Vec<RecordedError>,
}

impl ResultDocument {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scraped_at: Utc::now(),
            meta: PageMeta::default(),
            sections: Vec::new(),
            interactions: InteractionLog::default(),
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, phase: ErrorPhase, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?phase, %message, "recoverable extraction failure");
        self.errors.push(RecordedError { phase, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_in_wire_format() {
        assert_eq!(
            serde_json::to_string(&InteractionKind::ClickLoadMore).unwrap(),
            "\"click-load-more\""
        );
        assert_eq!(
            serde_json::to_string(&InteractionOutcome::SkippedCrossDomain).unwrap(),
            "\"skipped-cross-domain\""
        );
        assert_eq!(
            serde_json::to_string(&RetrievalMode::Rendered).unwrap(),
            "\"rendered\""
        );
        assert_eq!(serde_json::to_string(&ErrorPhase::Fetch).unwrap(), "\"fetch\"");
    }

    #[test]
    fn document_serializes_camel_case() {
        let doc = ResultDocument::new("https://example.com");
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("scrapedAt").is_some());
        assert!(value["interactions"].get("totalScrolls").is_some());
        assert!(value["meta"].get("retrievalMode").is_some());
        assert!(value["meta"].get("decisionReason").is_some());
    }
}
