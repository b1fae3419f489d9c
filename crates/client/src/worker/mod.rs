//! Offline worker: cache lifecycle plus fetch interception.
//!
//! ```text
//! Parsed --install--> Installing --ok--> Installed --activate--> Activating --> Activated
//!                          \--precache failed--> Redundant
//! ```
//!
//! Install signals skip-waiting, so activation may follow immediately;
//! activation claims every open client. Fetches are intercepted only while
//! `Activated`.

pub mod classify;
pub mod manager;
pub mod notify;
pub mod offline;
pub mod strategy;

use std::sync::Arc;

use tokio::sync::RwLock;
use url::Url;
use wallai_core::{AppConfig, CacheStorage, ConfigError, Error, Request};

pub use classify::{PassReason, Route, classify};
pub use manager::{ActivationReport, CacheManager};
pub use notify::Notification;
pub use offline::offline_response;
pub use strategy::{FetchInterceptor, Intercepted, Resolution};

use crate::fetch::Network;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

/// A single worker instance bound to one origin and one cache generation.
pub struct ServiceWorker {
    manager: CacheManager,
    interceptor: FetchInterceptor,
    dashboard: Url,
    lifecycle: RwLock<Lifecycle>,
}

impl ServiceWorker {
    pub fn new(manager: CacheManager, interceptor: FetchInterceptor, dashboard: Url) -> Self {
        Self {
            manager,
            interceptor,
            dashboard,
            lifecycle: RwLock::new(Lifecycle {
                state: WorkerState::Parsed,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }

    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        let manager = CacheManager::from_config(config, storage.clone(), network.clone())?;
        let interceptor = FetchInterceptor::from_config(config, storage, network)?;
        Ok(Self::new(manager, interceptor, config.resolve(&config.dashboard_path)?))
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    /// Whether install asked to replace the running worker without waiting.
    pub async fn skip_waiting(&self) -> bool {
        self.lifecycle.read().await.skip_waiting
    }

    /// Whether activation took control of open clients.
    pub async fn controls_clients(&self) -> bool {
        self.lifecycle.read().await.clients_claimed
    }

    pub fn manager(&self) -> &CacheManager {
        &self.manager
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut lifecycle = self.lifecycle.write().await;
        if lifecycle.state != from {
            return Err(Error::InvalidState(format!("expected {from}, worker is {}", lifecycle.state)));
        }
        tracing::debug!(%from, %to, "worker state change");
        lifecycle.state = to;
        Ok(())
    }

    /// Precache the shell. On failure the worker becomes redundant.
    pub async fn install(&self) -> Result<usize, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;
        tracing::info!("installing service worker");

        match self.manager.install().await {
            Ok(count) => {
                let mut lifecycle = self.lifecycle.write().await;
                lifecycle.state = WorkerState::Installed;
                lifecycle.skip_waiting = true;
                Ok(count)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to cache static files");
                self.lifecycle.write().await.state = WorkerState::Redundant;
                Err(e)
            }
        }
    }

    /// Purge stale stores and claim clients.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;
        tracing::info!("activating service worker");

        let report = match self.manager.activate().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate caches during activation");
                ActivationReport::default()
            }
        };

        let mut lifecycle = self.lifecycle.write().await;
        lifecycle.state = WorkerState::Activated;
        lifecycle.clients_claimed = true;
        tracing::info!(deleted = report.deleted.len(), "service worker activated");
        Ok(report)
    }

    /// Offer a request to the worker. Before activation nothing is intercepted.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Intercepted, Error> {
        if self.state().await != WorkerState::Activated {
            return Ok(Intercepted::Passthrough(self.interceptor.route(request)));
        }
        self.interceptor.handle(request).await
    }

    pub fn push(&self) -> Notification {
        notify::push()
    }

    pub fn notification_click(&self, action: &str) -> Option<Url> {
        notify::notification_click(action, &self.dashboard)
    }

    pub async fn sync(&self, tag: &str) -> bool {
        notify::sync(tag).await
    }
}
