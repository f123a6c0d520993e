//! URL cleanup, resolution and origin comparison

use url::Url;

/// Normalize user-supplied URLs: trim whitespace, default to https when no
/// scheme is present, and drop a trailing slash.
pub fn clean_url(url: &str) -> String {
    let url = url.trim();
    let url = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    url.trim_end_matches('/').to_string()
}

/// Resolve a possibly-relative href against `base`, returning an absolute
/// URL string. Returns `None` when the href cannot be resolved.
pub fn resolve_url(href: &str, base: &Url) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.into())
}

/// Strict same-origin check: scheme, host and port must all match.
/// An http→https upgrade or a port change counts as cross-origin.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_url_defaults_scheme() {
        assert_eq!(clean_url("example.com"), "https://example.com");
        assert_eq!(clean_url(" http://example.com/ "), "http://example.com");
    }

    #[test]
    fn resolve_relative_hrefs() {
        let base = Url::parse("https://example.com/docs/page").unwrap();
        assert_eq!(
            resolve_url("../about", &base).as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(
            resolve_url("/root", &base).as_deref(),
            Some("https://example.com/root")
        );
        assert_eq!(
            resolve_url("//cdn.example.com/x.png", &base).as_deref(),
            Some("https://cdn.example.com/x.png")
        );
        assert_eq!(resolve_url("", &base), None);
    }

    #[test]
    fn absolute_hrefs_pass_through() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            resolve_url("https://other.org/p", &base).as_deref(),
            Some("https://other.org/p")
        );
    }

    #[test]
    fn origin_comparison_is_strict() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b?q=1").unwrap();
        assert!(same_origin(&a, &b));

        // Scheme upgrade is cross-origin.
        let http = Url::parse("http://example.com/").unwrap();
        assert!(!same_origin(&a, &http));

        // Port difference is cross-origin.
        let port = Url::parse("https://example.com:8443/").unwrap();
        assert!(!same_origin(&a, &port));

        let other = Url::parse("https://other.com/").unwrap();
        assert!(!same_origin(&a, &other));
    }
}
