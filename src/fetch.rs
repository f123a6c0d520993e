//! Static retrieval path and page metadata extraction

use std::time::{Duration, Instant};

use url::Url;

use crate::ScrapeConfig;
use crate::dom::{PageDom, sel};
use crate::error::FetchError;
use crate::model::PageMeta;

/// Outcome of a successful static fetch: the noise-filtered DOM plus
/// retrieval metadata. The base URL is the final URL after redirects.
pub struct StaticPage {
    pub dom: PageDom,
    pub status: u16,
    pub elapsed: Duration,
}

/// Fetch and parse a page without executing scripts. Non-2xx statuses are
/// failures here; the strategy selector turns them into render escalation.
pub async fn fetch_static(
    client: &reqwest::Client,
    url: &Url,
    cfg: &ScrapeConfig,
) -> Result<StaticPage, FetchError> {
    let started = Instant::now();
    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(cfg.static_timeout_secs))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(cfg.static_timeout_secs)
            } else {
                e.into()
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    // Redirects may have moved us; resolve relative URLs against where we
    // actually landed.
    let final_url = response.url().clone();
    let body = response.text().await?;
    let elapsed = started.elapsed();

    tracing::debug!(
        url = %final_url,
        status = status.as_u16(),
        bytes = body.len(),
        ?elapsed,
        "static fetch complete"
    );

    Ok(StaticPage {
        dom: PageDom::parse(&body, final_url, cfg),
        status: status.as_u16(),
        elapsed,
    })
}

/// Pull title/description/language/canonical from a captured page.
/// Missing values stay empty; they are never errors.
pub fn page_meta(dom: &PageDom) -> PageMeta {
    let doc = dom.document();

    let title = doc
        .select(&sel("title"))
        .next()
        .map(|t| crate::utils::sanitize_text(&t.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    let description = doc
        .select(&sel(r#"meta[name="description"]"#))
        .next()
        .or_else(|| doc.select(&sel(r#"meta[property="og:description"]"#)).next())
        .and_then(|m| m.value().attr("content"))
        .map(|c| crate::utils::sanitize_text(c))
        .unwrap_or_default();

    let language = doc
        .select(&sel("html"))
        .next()
        .and_then(|h| h.value().attr("lang"))
        .unwrap_or_default()
        .to_string();

    let canonical_url = doc
        .select(&sel(r#"link[rel="canonical"]"#))
        .next()
        .and_then(|l| l.value().attr("href"))
        .and_then(|href| crate::utils::resolve_url(href, dom.base_url()))
        .unwrap_or_default();

    PageMeta {
        title,
        description,
        language,
        canonical_url,
        ..PageMeta::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> PageDom {
        PageDom::parse(
            html,
            Url::parse("https://example.com/a/b").unwrap(),
            &ScrapeConfig::default(),
        )
    }

    #[test]
    fn meta_fields_are_extracted() {
        let dom = dom(
            r#"<html lang="en"><head>
                <title> The  Title </title>
                <meta name="description" content="A description">
                <link rel="canonical" href="/canonical">
               </head><body></body></html>"#,
        );
        let meta = page_meta(&dom);
        assert_eq!(meta.title, "The Title");
        assert_eq!(meta.description, "A description");
        assert_eq!(meta.language, "en");
        assert_eq!(meta.canonical_url, "https://example.com/canonical");
    }

    #[test]
    fn missing_meta_stays_empty() {
        let meta = page_meta(&dom("<body><p>no head to speak of</p></body>"));
        assert_eq!(meta.title, "");
        assert_eq!(meta.description, "");
        assert_eq!(meta.language, "");
        assert_eq!(meta.canonical_url, "");
    }

    #[test]
    fn og_description_is_fallback() {
        let dom = dom(
            r#"<head><meta property="og:description" content="social blurb"></head><body></body>"#,
        );
        assert_eq!(page_meta(&dom).description, "social blurb");
    }
}
