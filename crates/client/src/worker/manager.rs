//! Cache lifecycle: precache on install, purge stale generations on activate.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use url::Url;
use wallai_core::{AppConfig, CacheNames, CacheStorage, ConfigError, Error, Request, Response};

use crate::fetch::Network;

/// Outcome of the stale-store sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Stores removed, in enumeration order.
    pub deleted: Vec<String>,
    /// Stores that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Owns the named stores backing offline support.
pub struct CacheManager {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    names: CacheNames,
    precache: Vec<Url>,
}

impl CacheManager {
    pub fn new(
        storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, names: CacheNames, precache: Vec<Url>,
    ) -> Self {
        Self { storage, network, names, precache }
    }

    /// Build a manager from configuration, resolving precache paths against the origin.
    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        let precache = config
            .precache
            .iter()
            .map(|path| config.resolve(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(storage, network, config.cache_names(), precache))
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    /// Open the static store and populate it with the shell assets.
    ///
    /// All assets are fetched concurrently. A transport failure or non-2xx
    /// status on any one of them aborts before anything is written. If a
    /// write fails, a store created by this install is dropped again; a
    /// store that already existed is left in place.
    pub async fn install(&self) -> Result<usize, Error> {
        tracing::info!(store = %self.names.static_store, "installing: precaching shell assets");
        let existed = self.storage.has(&self.names.static_store).await?;
        self.storage.open(&self.names.static_store).await?;

        let fetched = try_join_all(self.precache.iter().map(|url| self.fetch_asset(url))).await?;

        for (request, response) in &fetched {
            if let Err(e) = self.storage.put(&self.names.static_store, request, response).await {
                if !existed && let Err(cleanup) = self.storage.delete(&self.names.static_store).await {
                    tracing::warn!(error = %cleanup, "failed to drop partially populated store");
                }
                return Err(Error::PrecacheFailed(format!("{}: {e}", request.url)));
            }
        }

        tracing::info!(count = fetched.len(), "static files cached successfully");
        Ok(fetched.len())
    }

    async fn fetch_asset(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::PrecacheFailed(format!("{url}: {e}")))?;
        if !response.is_ok() {
            return Err(Error::PrecacheFailed(format!("{url}: status {}", response.status)));
        }
        Ok((request, response))
    }

    /// Delete every store that is not part of the current generation.
    ///
    /// Deletions run concurrently and fail independently; a failed deletion
    /// is reported, never propagated.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| !self.names.is_current(name))
            .collect();

        let results = join_all(stale.iter().map(|name| async move {
            tracing::info!(store = %name, "deleting old cache");
            (name.clone(), self.storage.delete(name).await)
        }))
        .await;

        let mut report = ActivationReport::default();
        for (name, result) in results {
            match result {
                Ok(_) => report.deleted.push(name),
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete old cache");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
