//! In-memory implementation of [`CacheStorage`].
//!
//! Uses a tokio RwLock around an insertion-ordered list of stores, so
//! store and entry ordering match the SQLite backend.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::hash::compute_cache_key;
use super::{CacheStorage, check_cacheable};
use crate::Error;
use crate::http::{Request, Response};

#[derive(Debug, Default)]
struct Store {
    name: String,
    entries: Vec<(String, String, Response)>,
}

/// Process-local cache storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    stores: Arc<RwLock<Vec<Store>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key_for(request: &Request) -> String {
    compute_cache_key(&request.method, &request.cache_url())
}

#[async_trait]
impl CacheStorage for MemoryCache {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|s| s.name == name) {
            stores.push(Store { name: name.to_string(), entries: Vec::new() });
        }
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.stores.read().await.iter().any(|s| s.name == name))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.stores.read().await.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        check_cacheable(request, response)?;
        let key = key_for(request);

        let mut stores = self.stores.write().await;
        let idx = match stores.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                stores.push(Store { name: name.to_string(), entries: Vec::new() });
                stores.len() - 1
            }
        };
        let store = &mut stores[idx];
        match store.entries.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 = response.clone(),
            None => store.entries.push((key, request.cache_url(), response.clone())),
        }
        Ok(())
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let key = key_for(request);
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.entries.iter().find(|(k, _, _)| *k == key))
            .map(|(_, _, r)| r.clone()))
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = key_for(request);
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .flat_map(|s| s.entries.iter())
            .find(|(k, _, _)| *k == key)
            .map(|(_, _, r)| r.clone()))
    }

    async fn entries(&self, name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.entries.iter().map(|(_, url, _)| url.clone()).collect())
            .unwrap_or_default())
    }
}
