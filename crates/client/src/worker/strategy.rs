//! Fetch interception: cache-first for shell assets, network-first for API paths.
//!
//! Each request resolves in a single pass with no retries:
//!
//! | strategy      | first        | on miss / failure                          |
//! |---------------|--------------|--------------------------------------------|
//! | cache-first   | static store | network (write-through on 200), then the   |
//! |               |              | cached document root for navigations       |
//! | network-first | network      | API store, then the synthetic 503 body     |

use std::sync::Arc;

use serde::Serialize;
use url::Url;
use wallai_core::{AppConfig, CacheNames, CacheStorage, ConfigError, Error, Request, Response};

use super::classify::{Route, classify};
use super::offline::offline_response;
use crate::fetch::Network;

/// Where the served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Served from cache without touching the network.
    CacheHit,
    /// Served from the network, not cached.
    Network,
    /// Served from the network after a write-through copy was stored.
    NetworkCached,
    /// Network failed; a cached copy was served instead.
    Fallback,
    /// Network and cache both failed; synthetic offline error served.
    Offline,
}

/// Result of offering a request to the interceptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Intercepted {
    /// Not handled; the caller performs a normal network request.
    Passthrough(Route),
    /// Handled by the worker.
    Served { response: Response, resolution: Resolution },
}

impl Intercepted {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Intercepted::Served { response, .. } => Some(response),
            Intercepted::Passthrough(_) => None,
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Intercepted::Served { resolution, .. } => Some(*resolution),
            Intercepted::Passthrough(_) => None,
        }
    }
}

/// Routes intercepted requests to a strategy and keeps the stores coherent.
pub struct FetchInterceptor {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    names: CacheNames,
    origin: Url,
    api_prefix: String,
}

impl FetchInterceptor {
    pub fn new(
        storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, names: CacheNames, origin: Url,
        api_prefix: impl Into<String>,
    ) -> Self {
        Self { storage, network, names, origin, api_prefix: api_prefix.into() }
    }

    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(storage, network, config.cache_names(), config.origin_url()?, config.api_prefix.clone()))
    }

    pub fn route(&self, request: &Request) -> Route {
        classify(request, &self.origin, &self.api_prefix)
    }

    /// Handle one intercepted request.
    ///
    /// Errors only when a cache-first request fails on the network and no
    /// navigation fallback applies.
    pub async fn handle(&self, request: &Request) -> Result<Intercepted, Error> {
        let route = self.route(request);
        let (response, resolution) = match route {
            Route::Passthrough(reason) => {
                tracing::debug!(url = %request.url, ?reason, "not intercepted");
                return Ok(Intercepted::Passthrough(route));
            }
            Route::CacheFirst => self.cache_first(request).await?,
            Route::NetworkFirst => self.network_first(request).await?,
        };
        Ok(Intercepted::Served { response, resolution })
    }

    async fn cache_first(&self, request: &Request) -> Result<(Response, Resolution), Error> {
        if let Some(cached) = self.lookup(&self.names.static_store, request).await {
            tracing::debug!(url = %request.url, "serving from cache");
            return Ok((cached, Resolution::CacheHit));
        }

        tracing::debug!(url = %request.url, "fetching from network");
        match self.network.fetch(request).await {
            Ok(response) => {
                let resolution = if response.status == 200
                    && self.store(&self.names.static_store, request, &response).await
                {
                    Resolution::NetworkCached
                } else {
                    Resolution::Network
                };
                Ok((response, resolution))
            }
            Err(e) if e.is_network() => {
                tracing::warn!(url = %request.url, error = %e, "cache-first strategy failed");
                if request.is_navigation()
                    && let Some(root) = self.document_root().await
                {
                    return Ok((root, Resolution::Fallback));
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn network_first(&self, request: &Request) -> Result<(Response, Resolution), Error> {
        tracing::debug!(url = %request.url, "API request - trying network first");
        match self.network.fetch(request).await {
            Ok(response) => {
                let resolution = if response.status == 200
                    && request.is_get()
                    && self.store(&self.names.api_store, request, &response).await
                {
                    tracing::debug!(url = %request.url, "API response cached");
                    Resolution::NetworkCached
                } else {
                    Resolution::Network
                };
                Ok((response, resolution))
            }
            Err(e) => {
                tracing::info!(url = %request.url, error = %e, "network failed, trying cache");
                if let Some(cached) = self.lookup(&self.names.api_store, request).await {
                    tracing::debug!(url = %request.url, "serving API from cache");
                    return Ok((cached, Resolution::Fallback));
                }
                Ok((offline_response()?, Resolution::Offline))
            }
        }
    }

    /// Cache read; a storage error counts as a miss.
    async fn lookup(&self, store: &str, request: &Request) -> Option<Response> {
        match self.storage.match_in(store, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(store, url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write-through; failure is logged and the response still served.
    async fn store(&self, store: &str, request: &Request, response: &Response) -> bool {
        match self.storage.put(store, request, response).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(store, url = %request.url, error = %e, "failed to cache response");
                false
            }
        }
    }

    async fn document_root(&self) -> Option<Response> {
        let root = self.origin.join("/").ok()?;
        self.lookup(&self.names.static_store, &Request::get(root)).await
    }
}
