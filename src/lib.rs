//! Structured web-content extraction via static HTTP fetch or a
//! Chromium-rendered session with bounded page interactions.
//!
//! The [`Engine`] is the entry point: it decides per URL whether a plain
//! HTTP fetch suffices or the page needs a real browser, detects content
//! sections in three tiers, strips boilerplate, and returns an immutable
//! [`ResultDocument`] with a full audit trail of interactions and errors.

mod browser;
pub mod browser_setup;
mod detect;
mod dom;
mod engine;
mod error;
mod extract;
mod fetch;
mod interact;
mod manager;
mod model;
mod noise;
mod strategy;
mod utils;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub use browser::{BrowserError, BrowserResult, BrowserWrapper};
pub use browser_setup::{find_browser_executable, launch_browser};
pub use engine::Engine;
pub use error::FetchError;
pub use manager::{BrowserManager, BrowserSession};
pub use model::{
    Content, ErrorPhase, Image, InteractionKind, InteractionLog, InteractionOutcome,
    InteractionRecord, Link, PageMeta, RecordedError, ResultDocument, RetrievalMode, Section,
    SectionKind,
};
pub use strategy::FetchMode;

pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Everything that tunes the extraction pipeline. Each field has a
/// working default; a partial config.yaml overrides only what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Static pages with less visible text than this are assumed to be
    /// client-side rendered and retried in the browser.
    #[serde(default = "default_text_threshold")]
    pub text_threshold: usize,

    /// Maximum applied interactions (tab clicks, load-mores, scroll
    /// rounds, paginations) per rendered scrape.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Scroll-to-bottom repetitions per scroll round.
    #[serde(default = "default_max_scroll_attempts")]
    pub max_scroll_attempts: usize,

    #[serde(default = "default_static_timeout_secs")]
    pub static_timeout_secs: u64,

    /// Budget for browser navigation and initial render.
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// Budget for each individual page interaction.
    #[serde(default = "default_interaction_timeout_secs")]
    pub interaction_timeout_secs: u64,

    /// Wall-clock budget for a whole scrape; on expiry the partial
    /// result is returned.
    #[serde(default = "default_global_timeout_secs")]
    pub global_timeout_secs: u64,

    /// Raw HTML kept per section before truncation.
    #[serde(default = "default_max_raw_html_len")]
    pub max_raw_html_len: usize,

    #[serde(default = "default_max_link_text_len")]
    pub max_link_text_len: usize,

    #[serde(default = "default_max_alt_text_len")]
    pub max_alt_text_len: usize,

    /// Case-insensitive substrings matched against element classes and
    /// ids to drop boilerplate (cookie banners, popups, ads).
    #[serde(default = "default_noise_patterns")]
    pub noise_patterns: Vec<String>,

    /// Button/link labels that identify load-more controls.
    #[serde(default = "default_load_more_labels")]
    pub load_more_labels: Vec<String>,

    /// Pause after a scroll for lazy content to land.
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    /// Pause after a click before re-reading the DOM.
    #[serde(default = "default_click_settle_ms")]
    pub click_settle_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_text_threshold() -> usize {
    400
}
fn default_max_depth() -> usize {
    3
}
fn default_max_scroll_attempts() -> usize {
    3
}
fn default_static_timeout_secs() -> u64 {
    30
}
fn default_render_timeout_secs() -> u64 {
    60
}
fn default_interaction_timeout_secs() -> u64 {
    10
}
fn default_global_timeout_secs() -> u64 {
    120
}
fn default_max_raw_html_len() -> usize {
    10_000
}
fn default_max_link_text_len() -> usize {
    200
}
fn default_max_alt_text_len() -> usize {
    200
}
fn default_noise_patterns() -> Vec<String> {
    ["cookie", "popup", "modal", "ads", "banner", "newsletter", "overlay"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_load_more_labels() -> Vec<String> {
    ["load", "more", "show"].into_iter().map(String::from).collect()
}
fn default_scroll_delay_ms() -> u64 {
    2000
}
fn default_click_settle_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    CHROME_USER_AGENT.to_string()
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_window_width() -> u32 {
    1280
}

fn default_window_height() -> u32 {
    720
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape: ScrapeConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            text_threshold: default_text_threshold(),
            max_depth: default_max_depth(),
            max_scroll_attempts: default_max_scroll_attempts(),
            static_timeout_secs: default_static_timeout_secs(),
            render_timeout_secs: default_render_timeout_secs(),
            interaction_timeout_secs: default_interaction_timeout_secs(),
            global_timeout_secs: default_global_timeout_secs(),
            max_raw_html_len: default_max_raw_html_len(),
            max_link_text_len: default_max_link_text_len(),
            max_alt_text_len: default_max_alt_text_len(),
            noise_patterns: default_noise_patterns(),
            load_more_labels: default_load_more_labels(),
            scroll_delay_ms: default_scroll_delay_ms(),
            click_settle_ms: default_click_settle_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            disable_security: default_disable_security(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Run the section pipeline over already-fetched HTML: noise filtering,
/// tiered detection and content extraction, with links resolved against
/// `url`. This is the same pipeline the [`Engine`] runs after either
/// retrieval path; it is public so callers with their own HTML source
/// can reuse it.
pub fn parse_sections(
    html: &str,
    url: &str,
    cfg: &ScrapeConfig,
) -> Result<Vec<Section>, FetchError> {
    let base = url::Url::parse(url)
        .map_err(|e| FetchError::InvalidUrl(url.to_string(), e.to_string()))?;
    let page = dom::PageDom::parse(html, base, cfg);
    Ok(detect::detect(&page, cfg))
}

/// Load config from config.yaml in package root
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml");

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.scrape.text_threshold, 400);
        assert_eq!(cfg.scrape.max_depth, 3);
        assert!(cfg.browser.headless);
        assert!(!cfg.browser.disable_security);
        assert_eq!(cfg.browser.window.width, 1280);
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "scrape:\n  text_threshold: 50\nbrowser:\n  headless: false\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.scrape.text_threshold, 50);
        assert_eq!(cfg.scrape.max_depth, 3);
        assert!(!cfg.browser.headless);
        assert_eq!(cfg.browser.window.height, 720);
    }
}
