//! Engine degradation behavior when retrieval fails outright.

use pagesift::{Config, Engine, ErrorPhase, FetchMode, SectionKind};

/// A loopback port with no listener: the fetch fails immediately with a
/// connection error, no network access required.
const DEAD_URL: &str = "http://127.0.0.1:9/";

#[tokio::test]
async fn forced_static_mode_with_failed_fetch_yields_fallback_section() {
    let engine = Engine::new(Config::default()).expect("engine");
    let doc = engine.scrape(DEAD_URL, FetchMode::Static, None).await;

    // The failure is recorded, not propagated.
    assert!(
        doc.errors.iter().any(|e| e.phase == ErrorPhase::Fetch),
        "expected a recorded fetch error, got {:?}",
        doc.errors
    );

    // Degradation still produces the explicit empty fallback section,
    // same as when the rendered path fails.
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].kind, SectionKind::Fallback);
    assert!(doc.sections[0].content.is_empty());

    assert_eq!(doc.meta.decision_reason, "static mode requested by caller");
}
