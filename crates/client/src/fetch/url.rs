//! URL resolution and origin checks for intercepted requests.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a path or absolute URL against the worker origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join origin-relative paths (`/...`) onto `origin`
/// 3. Require http or https
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.starts_with('/') {
        origin.join(trimmed)
    } else {
        Url::parse(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://wallai.test").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&origin(), "/static/css/style.css").unwrap();
        assert_eq!(url.as_str(), "https://wallai.test/static/css/style.css");
    }

    #[test]
    fn test_resolve_absolute_url() {
        let url = resolve(&origin(), "https://cdn.example.com/lib.js").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_resolve_lowercases_host_and_drops_fragment() {
        let url = resolve(&origin(), "  https://WALLAI.test/dashboard/#budgets ").unwrap();
        assert_eq!(url.as_str(), "https://wallai.test/dashboard/");
    }

    #[test]
    fn test_resolve_preserves_query() {
        let url = resolve(&origin(), "/api/expenses/?page=2&size=10").unwrap();
        assert_eq!(url.query(), Some("page=2&size=10"));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("https://wallai.test/api/budgets/").unwrap();
        assert!(is_same_origin(&a, &origin()));
        assert!(!is_same_origin(&a, &Url::parse("http://wallai.test").unwrap()));
        assert!(!is_same_origin(&a, &Url::parse("https://wallai.test:8443").unwrap()));
        assert!(!is_same_origin(&a, &Url::parse("https://api.ipify.org").unwrap()));
    }
}
