//! Extraction orchestrator: one entry point that turns a URL into a
//! `ResultDocument`, deciding between the static and rendered pipelines
//! and never propagating an error past the boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use url::Url;

use crate::detect::detect;
use crate::dom::PageDom;
use crate::error::FetchError;
use crate::fetch::{fetch_static, page_meta};
use crate::interact;
use crate::manager::BrowserManager;
use crate::model::{ErrorPhase, PageMeta, ResultDocument, RetrievalMode, Section};
use crate::strategy::{FetchMode, StaticSummary, decide};
use crate::utils::clean_url;
use crate::{Config, ScrapeConfig};

/// How long to poll a freshly navigated page for a content root before
/// extracting anyway.
const CONTENT_ROOT_POLLS: usize = 10;
const CONTENT_ROOT_POLL_MS: u64 = 300;

/// Orchestrates the scrape pipeline. Cheap to clone behind an `Arc`;
/// holds the shared browser manager and a reusable HTTP client.
pub struct Engine {
    cfg: Config,
    manager: Arc<BrowserManager>,
    client: reqwest::Client,
}

/// Successfully parsed static page plus everything derived from it,
/// carried forward so a render-path failure can fall back to it.
struct StaticOutcome {
    sections: Vec<Section>,
    meta: PageMeta,
}

impl Engine {
    pub fn new(cfg: Config) -> Result<Self, FetchError> {
        let manager = Arc::new(BrowserManager::new(
            cfg.browser.clone(),
            cfg.scrape.user_agent.clone(),
        ));
        let client = reqwest::Client::builder()
            .user_agent(&cfg.scrape.user_agent)
            .build()?;
        Ok(Self {
            cfg,
            manager,
            client,
        })
    }

    pub fn manager(&self) -> &Arc<BrowserManager> {
        &self.manager
    }

    /// Close the browser if one is running. Call before process exit.
    pub async fn shutdown(&self) {
        if let Err(e) = self.manager.shutdown().await {
            tracing::warn!("browser shutdown failed: {e}");
        }
    }

    /// Scrape a URL into an immutable result document. Never fails:
    /// every error is recorded inside the document instead. The whole
    /// run is bounded by the global wall-clock budget; on expiry the
    /// partial document built so far is returned with an engine error
    /// appended.
    pub async fn scrape(
        &self,
        raw_url: &str,
        mode: FetchMode,
        max_depth: Option<usize>,
    ) -> ResultDocument {
        let url_str = clean_url(raw_url);
        let mut doc = ResultDocument::new(&url_str);
        let url = match Url::parse(&url_str) {
            Ok(url) => url,
            Err(e) => {
                doc.record_error(ErrorPhase::Fetch, format!("invalid url {url_str:?}: {e}"));
                return doc;
            }
        };

        let budget = Duration::from_secs(self.cfg.scrape.global_timeout_secs);
        let deadline = Instant::now() + budget;
        tracing::info!(url = %url, ?mode, "scrape started");
        if timeout(budget, self.scrape_inner(&mut doc, &url, mode, max_depth, deadline))
            .await
            .is_err()
        {
            doc.record_error(
                ErrorPhase::Engine,
                format!(
                    "global timeout after {}s, returning partial result",
                    self.cfg.scrape.global_timeout_secs
                ),
            );
        }
        tracing::info!(
            url = %url,
            sections = doc.sections.len(),
            errors = doc.errors.len(),
            "scrape finished"
        );
        doc
    }

    async fn scrape_inner(
        &self,
        doc: &mut ResultDocument,
        url: &Url,
        mode: FetchMode,
        max_depth: Option<usize>,
        deadline: Instant,
    ) {
        let cfg = &self.cfg.scrape;
        let max_depth = max_depth.unwrap_or(cfg.max_depth);

        let mut summary = StaticSummary::failed();
        let mut static_outcome = None;
        if mode != FetchMode::Js {
            match fetch_static(&self.client, url, cfg).await {
                Ok(page) => {
                    tracing::debug!(
                        status = page.status,
                        elapsed_ms = page.elapsed.as_millis() as u64,
                        "static fetch succeeded"
                    );
                    let sections = detect(&page.dom, cfg);
                    summary = StaticSummary::from_page(&page.dom, &sections);
                    let meta = page_meta(&page.dom);
                    static_outcome = Some(StaticOutcome { sections, meta });
                }
                Err(e) => {
                    doc.record_error(ErrorPhase::Fetch, e.to_string());
                }
            }
        }

        let decision = decide(&summary, mode, cfg);
        tracing::debug!(use_render = decision.use_render, reason = %decision.reason, "strategy");

        if !decision.use_render {
            match static_outcome {
                Some(outcome) => {
                    doc.sections = outcome.sections;
                    doc.meta = outcome.meta;
                    doc.meta.retrieval_mode = RetrievalMode::Static;
                }
                // Static mode was forced and the fetch failed: degrade
                // the same way the render path does, with an explicit
                // empty fallback section rather than a missing one.
                None => {
                    doc.sections = detect(&PageDom::parse("", url.clone(), cfg), cfg);
                }
            }
            doc.meta.decision_reason = decision.reason;
            return;
        }

        match self.render(doc, url, cfg, max_depth, deadline).await {
            Ok(()) => {
                doc.meta.decision_reason = decision.reason;
            }
            Err(e) => {
                doc.record_error(ErrorPhase::Fetch, e.to_string());
                // The static capture, if any, is better than nothing.
                if let Some(outcome) = static_outcome {
                    doc.sections = outcome.sections;
                    doc.meta = outcome.meta;
                    doc.meta.retrieval_mode = RetrievalMode::Static;
                } else {
                    // Both retrieval paths failed: callers still get an
                    // explicit empty fallback section, never a missing one.
                    doc.sections = detect(&PageDom::parse("", url.clone(), cfg), cfg);
                }
                doc.meta.decision_reason = decision.reason;
            }
        }
    }

    /// The rendered pipeline: exclusive browser session, navigation,
    /// initial detection, bounded interactions, final metadata.
    async fn render(
        &self,
        doc: &mut ResultDocument,
        url: &Url,
        cfg: &ScrapeConfig,
        max_depth: usize,
        deadline: Instant,
    ) -> Result<(), FetchError> {
        let session = self
            .manager
            .acquire()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;
        let browser = session
            .browser()
            .map_err(|e| FetchError::Render(e.to_string()))?;

        // Stray pages from an earlier run would leak memory in the
        // long-lived browser.
        if let Ok(pages) = browser.pages().await {
            for page in pages {
                let _ = page.close().await;
            }
        }

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Render(format!("page creation failed: {e}")))?;

        let render_budget = Duration::from_secs(cfg.render_timeout_secs);
        let nav = async {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };
        match timeout(render_budget, nav).await {
            Err(_) => {
                let _ = page.close().await;
                return Err(FetchError::Timeout(cfg.render_timeout_secs));
            }
            Ok(Err(e)) => {
                let _ = page.close().await;
                return Err(FetchError::Render(format!("navigation failed: {e}")));
            }
            Ok(Ok(())) => {}
        }

        self.wait_for_content_root(&page).await;

        let step = Duration::from_secs(cfg.interaction_timeout_secs);
        let html = match timeout(step, page.content()).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                let _ = page.close().await;
                return Err(FetchError::Render(format!("content capture failed: {e}")));
            }
            Err(_) => {
                let _ = page.close().await;
                return Err(FetchError::Timeout(cfg.interaction_timeout_secs));
            }
        };

        // Redirects may have moved us; resolve links against where we
        // actually landed.
        let current = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        let dom = PageDom::parse(&html, current.clone(), cfg);
        let sections = detect(&dom, cfg);
        let mut meta = page_meta(&dom);

        let run = interact::run(&page, &current, sections, cfg, max_depth, deadline).await;

        // Interactions may have swapped content under the same URL;
        // refresh metadata from the settled page when we can.
        if !run.log.records.is_empty() {
            if let Ok(Ok(final_html)) = timeout(step, page.content()).await {
                meta = page_meta(&PageDom::parse(&final_html, current, cfg));
            }
        }
        meta.retrieval_mode = RetrievalMode::Rendered;

        doc.sections = run.sections;
        doc.meta = meta;
        doc.interactions = run.log;
        doc.errors.extend(run.errors);

        let _ = page.close().await;
        Ok(())
    }

    /// Give client-side frameworks a moment to mount a content root
    /// before the first extraction. Best effort; extraction proceeds
    /// either way.
    async fn wait_for_content_root(&self, page: &chromiumoxide::Page) {
        for _ in 0..CONTENT_ROOT_POLLS {
            if page
                .find_element("main, article, [role='main']")
                .await
                .is_ok()
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(CONTENT_ROOT_POLL_MS)).await;
        }
    }
}
