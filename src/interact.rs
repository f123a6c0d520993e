//! Interaction controller: bounded user-like interactions on a rendered
//! page
//!
//! One cycle probes, in order: tabs → load-more → infinite scroll →
//! pagination. The first eligible action in a cycle is applied, recorded,
//! sections are re-detected from the live DOM, and the cycle restarts.
//! The run terminates at `max_depth` applied actions, after a full cycle
//! with no eligible action, or when the wall-clock deadline passes.
//!
//! Safety guarantees: cross-origin navigation is never followed (strict
//! origin equality on scheme, host and port), every action carries its
//! own timeout, and a timed-out target is never retried.
//!
//! Eligibility bookkeeping lives in `RunState`, separate from the live
//! page, so the bounding rules are testable without a browser. Tabs and
//! pagination links are one-shot (re-clicking a tab or revisiting a page
//! gains nothing); a load-more control stays eligible cycle after cycle,
//! since clicking it again is exactly how more content loads, and only
//! the depth limit stops it.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use chromiumoxide::element::Element;
use chromiumoxide::layout::Point;
use chromiumoxide_cdp::cdp::js_protocol::runtime::CallFunctionOnParams;
use tokio::time::timeout;
use url::Url;

use crate::ScrapeConfig;
use crate::detect::detect;
use crate::dom::PageDom;
use crate::model::{
    ErrorPhase, InteractionKind, InteractionLog, InteractionOutcome, InteractionRecord,
    RecordedError, Section,
};
use crate::utils::{same_origin, sanitize_text, truncate};

const TAB_SELECTOR: &str = "[role='tab'], [data-tab], .tab";
const CLICKABLE_SELECTOR: &str = "button, a, [role='button']";

/// Caps apply to candidates that pass the per-kind filter, not to the
/// raw element list, so a matching control deep in the page is still
/// considered.
const MAX_TAB_CANDIDATES: usize = 10;
const MAX_LOAD_MORE_CANDIDATES: usize = 25;
const MAX_PAGINATION_CANDIDATES: usize = 40;
const MAX_LABEL_CHARS: usize = 60;

/// Sentinel target for the per-page scroll action.
const SCROLL_TARGET: &str = "scroll-to-bottom";

/// Everything a finished (or aborted) interaction run hands back to the
/// engine. Sections are always the most recent successful re-detection.
pub struct InteractionRun {
    pub sections: Vec<Section>,
    pub log: InteractionLog,
    pub errors: Vec<RecordedError>,
}

/// Does a visible label qualify an element as a load-more control?
fn label_matches(label: &str, needles: &[String]) -> bool {
    let label = label.to_ascii_lowercase();
    needles
        .iter()
        .any(|needle| label.contains(&needle.to_ascii_lowercase()))
}

/// Filter first, cap after: indices of the first `cap` items satisfying
/// `keep`. Capping the raw candidate list instead would hide a matching
/// control behind unrelated clickables earlier in the page.
fn capped_matches<T, F>(items: &[T], keep: F, cap: usize) -> Vec<usize>
where
    F: Fn(&T) -> bool,
{
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| keep(item))
        .map(|(idx, _)| idx)
        .take(cap)
        .collect()
}

/// Does a link look like a "next page" control?
fn looks_like_next(rel: Option<&str>, text: &str) -> bool {
    if rel == Some("next") {
        return true;
    }
    let text = text.trim().to_ascii_lowercase();
    text == "»" || text == "›" || text.contains("next")
}

/// Pure bookkeeping for one interaction run: depth accounting, target
/// eligibility and the append-only audit log. No page handle, no I/O.
struct RunState {
    max_depth: usize,
    depth: usize,
    /// One-shot targets (tabs, followed pagination links).
    clicked: HashSet<String>,
    /// Targets retired for the rest of the run (timed out, cross-origin,
    /// click errors).
    ineligible: HashSet<String>,
    /// Targets already recorded with a skip outcome, to keep the audit
    /// trail free of repeats.
    noted: HashSet<String>,
    log: InteractionLog,
    errors: Vec<RecordedError>,
}

impl RunState {
    fn new(max_depth: usize, start_url: &Url) -> Self {
        Self {
            max_depth,
            depth: 0,
            clicked: HashSet::new(),
            ineligible: HashSet::new(),
            noted: HashSet::new(),
            log: InteractionLog {
                pages: vec![start_url.to_string()],
                ..InteractionLog::default()
            },
            errors: Vec::new(),
        }
    }

    fn depth_reached(&self) -> bool {
        self.depth >= self.max_depth
    }

    fn blocked(&self, target: &str) -> bool {
        self.clicked.contains(target) || self.ineligible.contains(target)
    }

    fn record(&mut self, kind: InteractionKind, target: &str, outcome: InteractionOutcome) {
        tracing::debug!(?kind, target, ?outcome, depth = self.depth, "interaction");
        self.log.records.push(InteractionRecord {
            kind,
            target: target.to_string(),
            outcome,
            depth: self.depth,
        });
    }

    /// Count one applied action against the depth budget.
    fn applied(&mut self, kind: InteractionKind, target: &str) {
        self.depth += 1;
        self.record(kind, target, InteractionOutcome::Applied);
    }

    /// Mark a one-shot target as spent.
    fn remember_clicked(&mut self, target: &str) {
        self.clicked.insert(target.to_string());
    }

    /// Retire a target for the rest of the run.
    fn retire(&mut self, target: &str) {
        self.ineligible.insert(target.to_string());
    }

    /// Record a skip outcome at most once per target.
    fn skip_once(&mut self, kind: InteractionKind, target: &str, outcome: InteractionOutcome) {
        if self.noted.insert(target.to_string()) {
            self.record(kind, target, outcome);
        }
    }

    /// A timed-out target is recorded and never retried.
    fn timed_out(&mut self, kind: InteractionKind, target: &str) {
        self.retire(target);
        self.record(kind, target, InteractionOutcome::TimedOut);
    }

    fn interact_error(&mut self, message: String) {
        tracing::warn!(%message, "interaction failed");
        self.errors.push(RecordedError {
            phase: ErrorPhase::Interact,
            message,
        });
    }

    fn parse_error(&mut self, message: String) {
        self.errors.push(RecordedError {
            phase: ErrorPhase::Parse,
            message,
        });
    }

    fn count_scroll(&mut self) {
        self.log.total_scrolls += 1;
    }

    /// Extend the visited-pages trail, once per URL.
    fn visit(&mut self, url: String) {
        if !self.log.pages.contains(&url) {
            self.log.pages.push(url);
        }
    }
}

/// Drive bounded interactions against `page`, starting from the given
/// initial section set, until depth/eligibility/deadline stops the run.
pub async fn run(
    page: &Page,
    start_url: &Url,
    initial_sections: Vec<Section>,
    cfg: &ScrapeConfig,
    max_depth: usize,
    deadline: Instant,
) -> InteractionRun {
    let mut controller = Controller {
        page,
        cfg,
        origin: start_url.clone(),
        current_url: start_url.clone(),
        deadline,
        sections: initial_sections,
        state: RunState::new(max_depth, start_url),
    };
    controller.drive().await;
    InteractionRun {
        sections: controller.sections,
        log: controller.state.log,
        errors: controller.state.errors,
    }
}

struct Controller<'a> {
    page: &'a Page,
    cfg: &'a ScrapeConfig,
    /// Origin every navigation is checked against.
    origin: Url,
    current_url: Url,
    deadline: Instant,
    sections: Vec<Section>,
    state: RunState,
}

impl Controller<'_> {
    fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.interaction_timeout_secs)
    }

    async fn drive(&mut self) {
        while !self.state.depth_reached() && Instant::now() < self.deadline {
            let acted = self.probe_tabs().await
                || self.probe_load_more().await
                || self.probe_scroll().await
                || self.probe_pagination().await;
            if !acted {
                tracing::debug!(depth = self.state.depth, "no eligible interaction left");
                break;
            }
        }
    }

    async fn find(&self, selector: &str) -> Vec<Element> {
        match timeout(self.step_timeout(), self.page.find_elements(selector)).await {
            Ok(Ok(elements)) => elements,
            _ => Vec::new(),
        }
    }

    /// An element without a clickable point is hidden, zero-sized or
    /// obscured; the returned point is what we actually click.
    async fn clickable_point(&self, el: &Element) -> Option<Point> {
        el.clickable_point().await.ok()
    }

    async fn element_label(&self, el: &Element) -> String {
        el.inner_text()
            .await
            .ok()
            .flatten()
            .map(|t| sanitize_text(&t))
            .filter(|t| !t.is_empty())
            .map(|t| truncate(&t, MAX_LABEL_CHARS))
            .unwrap_or_else(|| "unlabeled".to_string())
    }

    async fn probe_tabs(&mut self) -> bool {
        let candidates = self.find(TAB_SELECTOR).await;
        for el in candidates.into_iter().take(MAX_TAB_CANDIDATES) {
            let label = self.element_label(&el).await;
            let target = format!("tab \"{label}\"");
            if self.state.blocked(&target) {
                continue;
            }
            let Some(point) = self.clickable_point(&el).await else {
                self.state.skip_once(
                    InteractionKind::ClickTab,
                    &target,
                    InteractionOutcome::SkippedNotVisible,
                );
                continue;
            };
            let applied = self
                .click_and_refresh(InteractionKind::ClickTab, &target, point)
                .await;
            if applied {
                self.state.remember_clicked(&target);
            }
            return applied;
        }
        false
    }

    async fn probe_load_more(&mut self) -> bool {
        let candidates = self.find(CLICKABLE_SELECTOR).await;
        let mut labels = Vec::with_capacity(candidates.len());
        for el in &candidates {
            labels.push(self.element_label(el).await);
        }
        let eligible = capped_matches(
            &labels,
            |label| label_matches(label, &self.cfg.load_more_labels),
            MAX_LOAD_MORE_CANDIDATES,
        );
        for idx in eligible {
            let target = format!("load-more \"{}\"", labels[idx]);
            if self.state.blocked(&target) {
                continue;
            }
            let Some(point) = self.clickable_point(&candidates[idx]).await else {
                self.state.skip_once(
                    InteractionKind::ClickLoadMore,
                    &target,
                    InteractionOutcome::SkippedNotVisible,
                );
                continue;
            };
            // Deliberately not remembered as clicked: the same button is
            // clicked again next cycle to load the next batch, until the
            // depth limit stops the run.
            return self
                .click_and_refresh(InteractionKind::ClickLoadMore, &target, point)
                .await;
        }
        false
    }

    /// Click, settle, verify we stayed on the original origin, then
    /// re-detect sections. A cross-origin landing is rolled back and the
    /// target retired.
    async fn click_and_refresh(
        &mut self,
        kind: InteractionKind,
        target: &str,
        point: Point,
    ) -> bool {
        match timeout(self.step_timeout(), self.page.click(point)).await {
            Err(_) => {
                self.state.timed_out(kind, target);
                return false;
            }
            Ok(Err(e)) => {
                self.state.retire(target);
                self.state
                    .interact_error(format!("click failed on {target}: {e}"));
                return false;
            }
            Ok(Ok(_)) => {}
        }

        tokio::time::sleep(Duration::from_millis(self.cfg.click_settle_ms)).await;

        if let Ok(Some(url_str)) = self.page.url().await {
            if let Ok(now) = Url::parse(&url_str) {
                if !same_origin(&now, &self.origin) {
                    let _ = timeout(self.step_timeout(), self.page.goto(self.current_url.as_str()))
                        .await;
                    self.state.retire(target);
                    self.state
                        .record(kind, target, InteractionOutcome::SkippedCrossDomain);
                    return false;
                }
                self.current_url = now;
            }
        }

        self.state.applied(kind, target);
        self.refresh_sections().await;
        true
    }

    /// Scroll to the bottom up to `max_scroll_attempts` times per cycle.
    /// A growing scroll height is the infinite-scroll signal; pages that
    /// merely re-layout lazy-loaded media can false-positive here, which
    /// is an accepted imprecision of the heuristic.
    async fn probe_scroll(&mut self) -> bool {
        if self.state.blocked(SCROLL_TARGET) {
            return false;
        }

        let mut grew = false;
        for _ in 0..self.cfg.max_scroll_attempts {
            let Some(before) = self.scroll_height().await else {
                break;
            };
            let call = CallFunctionOnParams::builder()
                .function_declaration("() => window.scrollTo(0, document.body.scrollHeight)")
                .build();
            let Ok(call) = call else {
                break;
            };
            match timeout(self.step_timeout(), self.page.evaluate_function(call)).await {
                Err(_) => {
                    self.state.timed_out(InteractionKind::Scroll, SCROLL_TARGET);
                    break;
                }
                Ok(Err(e)) => {
                    self.state.interact_error(format!("scroll failed: {e}"));
                    break;
                }
                Ok(Ok(_)) => {}
            }
            tokio::time::sleep(Duration::from_millis(self.cfg.scroll_delay_ms)).await;
            let Some(after) = self.scroll_height().await else {
                break;
            };
            if after > before {
                grew = true;
                self.state.count_scroll();
            } else {
                break;
            }
        }

        if grew {
            self.state.applied(InteractionKind::Scroll, SCROLL_TARGET);
            self.refresh_sections().await;
            true
        } else {
            false
        }
    }

    async fn scroll_height(&self) -> Option<i64> {
        let result = timeout(
            self.step_timeout(),
            self.page.evaluate("document.body.scrollHeight"),
        )
        .await
        .ok()?
        .ok()?;
        result.into_value::<i64>().ok()
    }

    /// Follow a same-origin "next page" link; the landed page replaces
    /// the working page and extends the visited trail.
    async fn probe_pagination(&mut self) -> bool {
        let candidates = self.find("a").await;
        let mut keys = Vec::with_capacity(candidates.len());
        for el in &candidates {
            let rel = el.attribute("rel").await.ok().flatten();
            let label = self.element_label(el).await;
            keys.push((rel, label));
        }
        let eligible = capped_matches(
            &keys,
            |(rel, label)| looks_like_next(rel.as_deref(), label),
            MAX_PAGINATION_CANDIDATES,
        );
        for idx in eligible {
            let el = &candidates[idx];
            let Some(href) = el.attribute("href").await.ok().flatten() else {
                continue;
            };
            let Ok(destination) = self.current_url.join(&href) else {
                continue;
            };
            let target = format!("paginate {destination}");
            if self.state.blocked(&target) {
                continue;
            }
            if !same_origin(&destination, &self.origin) {
                self.state.retire(&target);
                self.state.skip_once(
                    InteractionKind::Paginate,
                    &target,
                    InteractionOutcome::SkippedCrossDomain,
                );
                continue;
            }
            let Some(point) = self.clickable_point(el).await else {
                self.state.skip_once(
                    InteractionKind::Paginate,
                    &target,
                    InteractionOutcome::SkippedNotVisible,
                );
                continue;
            };

            match timeout(self.step_timeout(), self.page.click(point)).await {
                Err(_) => {
                    self.state.timed_out(InteractionKind::Paginate, &target);
                    return false;
                }
                Ok(Err(e)) => {
                    self.state.retire(&target);
                    self.state
                        .interact_error(format!("pagination click failed on {target}: {e}"));
                    return false;
                }
                Ok(Ok(_)) => {}
            }
            let _ = timeout(self.step_timeout(), self.page.wait_for_navigation()).await;

            if let Ok(Some(url_str)) = self.page.url().await {
                if let Ok(now) = Url::parse(&url_str) {
                    if !same_origin(&now, &self.origin) {
                        // The link lied about its destination; back out.
                        let _ = timeout(
                            self.step_timeout(),
                            self.page.goto(self.current_url.as_str()),
                        )
                        .await;
                        self.state.retire(&target);
                        self.state.record(
                            InteractionKind::Paginate,
                            &target,
                            InteractionOutcome::SkippedCrossDomain,
                        );
                        return false;
                    }
                    self.current_url = now;
                }
            }
            self.state.visit(self.current_url.to_string());

            self.state.remember_clicked(&target);
            self.state.applied(InteractionKind::Paginate, &target);
            self.refresh_sections().await;
            return true;
        }
        false
    }

    /// Re-run section detection on the live DOM. On failure the previous
    /// section set stays; the run always returns the best observed one.
    async fn refresh_sections(&mut self) {
        match timeout(self.step_timeout(), self.page.content()).await {
            Ok(Ok(html)) => {
                let dom = PageDom::parse(&html, self.current_url.clone(), self.cfg);
                self.sections = detect(&dom, self.cfg);
            }
            Ok(Err(e)) => self.state.parse_error(format!("re-detection failed: {e}")),
            Err(_) => self
                .state
                .parse_error("re-detection timed out".to_string()),
        }
    }
}
