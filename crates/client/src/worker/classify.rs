//! Request classification: which strategy, if any, handles a request.
//!
//! Rules, first match wins:
//! 1. non-GET method: pass through
//! 2. cross-origin: pass through
//! 3. path under the API prefix: network-first
//! 4. anything else: cache-first

use serde::Serialize;
use url::Url;
use wallai_core::Request;

use crate::fetch::is_same_origin;

/// Why a request was left to the browser's normal network handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    NonGet,
    CrossOrigin,
}

/// Strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Passthrough(PassReason),
    NetworkFirst,
    CacheFirst,
}

impl Route {
    pub fn is_intercepted(&self) -> bool {
        !matches!(self, Route::Passthrough(_))
    }
}

/// Classify `request` for a worker registered on `origin`.
pub fn classify(request: &Request, origin: &Url, api_prefix: &str) -> Route {
    if !request.is_get() {
        return Route::Passthrough(PassReason::NonGet);
    }
    if !is_same_origin(&request.url, origin) {
        return Route::Passthrough(PassReason::CrossOrigin);
    }
    if request.url.path().starts_with(api_prefix) {
        Route::NetworkFirst
    } else {
        Route::CacheFirst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://wallai.test").unwrap()
    }

    fn route(method: &str, url: &str) -> Route {
        classify(&Request::new(method, Url::parse(url).unwrap()), &origin(), "/api/")
    }

    #[test]
    fn test_non_get_passes_through() {
        assert_eq!(route("POST", "https://wallai.test/api/budgets/"), Route::Passthrough(PassReason::NonGet));
        assert_eq!(
            route("DELETE", "https://wallai.test/budgets/api/delete/4/"),
            Route::Passthrough(PassReason::NonGet)
        );
    }

    #[test]
    fn test_non_get_checked_before_origin() {
        assert_eq!(route("PUT", "https://other.test/api/x/"), Route::Passthrough(PassReason::NonGet));
    }

    #[test]
    fn test_cross_origin_passes_through() {
        assert_eq!(
            route("GET", "https://api.ipify.org/?format=json"),
            Route::Passthrough(PassReason::CrossOrigin)
        );
        assert!(!route("GET", "http://wallai.test/api/budgets/").is_intercepted());
    }

    #[test]
    fn test_api_prefix_is_network_first() {
        assert_eq!(route("GET", "https://wallai.test/api/budgets/"), Route::NetworkFirst);
        assert_eq!(route("GET", "https://wallai.test/api/auth/user/?x=1"), Route::NetworkFirst);
    }

    #[test]
    fn test_prefix_match_is_anchored() {
        assert_eq!(route("GET", "https://wallai.test/budgets/api/delete/4/"), Route::CacheFirst);
        assert_eq!(route("GET", "https://wallai.test/api"), Route::CacheFirst);
    }

    #[test]
    fn test_everything_else_is_cache_first() {
        assert_eq!(route("GET", "https://wallai.test/"), Route::CacheFirst);
        assert_eq!(route("GET", "https://wallai.test/static/js/app.js"), Route::CacheFirst);
    }
}
