//! Named, versioned cache stores for offline support.
//!
//! A store maps request identity (method + URL, GET only) to a captured
//! response. Two backends implement [`CacheStorage`]:
//!
//! - [`CacheDb`]: persistent SQLite storage via tokio-rusqlite (WAL mode,
//!   schema migrations, entries cascade-deleted with their store)
//! - [`MemoryCache`]: process-local storage for tests and ephemeral workers
//!
//! Writes are whole-key UPSERTs, so concurrent writers race with
//! last-write-wins semantics.

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod stores;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{Request, Response};

pub use connection::CacheDb;
pub use memory::MemoryCache;

/// Key-value cache storage partitioned into named stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// All store names, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and every entry in it. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Store `response` for `request` in `name`, creating the store if needed.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Look up `request` in a single store.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look up `request` across all stores, oldest store first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// URLs stored in `name`, in insertion order.
    async fn entries(&self, name: &str) -> Result<Vec<String>, Error>;
}

/// Reject entries the cache must never hold.
pub(crate) fn check_cacheable(request: &Request, response: &Response) -> Result<(), Error> {
    if !request.is_get() {
        return Err(Error::InvalidInput(format!("cannot cache {} request {}", request.method, request.url)));
    }
    if response.status == 206 {
        return Err(Error::InvalidInput(format!("cannot cache partial response for {}", request.url)));
    }
    Ok(())
}

/// Current store names for one cache generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_store: String,
    pub api_store: String,
}

impl CacheNames {
    /// Derive store names from a prefix and version tag,
    /// e.g. `wallai` + `v1.0.0` gives `wallai-v1.0.0` and `wallai-api-v1.0.0`.
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { static_store: format!("{prefix}-{version}"), api_store: format!("{prefix}-api-{version}") }
    }

    /// Whether `name` belongs to the current generation.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_store || name == self.api_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_names() {
        let names = CacheNames::new("wallai", "v1.0.0");
        assert_eq!(names.static_store, "wallai-v1.0.0");
        assert_eq!(names.api_store, "wallai-api-v1.0.0");
        assert!(names.is_current("wallai-api-v1.0.0"));
        assert!(!names.is_current("wallai-v0.9.0"));
    }

    #[test]
    fn test_check_cacheable_rejects_post() {
        let req = Request::new("POST", url::Url::parse("https://wallai.test/api/x/").unwrap());
        assert!(matches!(check_cacheable(&req, &Response::new(200, "")), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_check_cacheable_rejects_partial() {
        let req = Request::parse_get("https://wallai.test/video").unwrap();
        assert!(check_cacheable(&req, &Response::new(206, "")).is_err());
        assert!(check_cacheable(&req, &Response::new(404, "")).is_ok());
    }
}
