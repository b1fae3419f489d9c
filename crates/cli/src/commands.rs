//! Subcommand handlers. Each returns the JSON document printed on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use wallai_client::budgets::{ConfirmOutcome, DeleteFlow, DeleteTarget, FlowSettings, HttpBudgetApi};
use wallai_client::fetch::{FetchConfig, HttpNetwork, media_type, resolve};
use wallai_client::worker::{FetchInterceptor, Intercepted, ServiceWorker, notify};
use wallai_core::{AppConfig, CacheDb, CacheStorage, Request, RequestMode};

use crate::view::ConsoleView;

async fn open_storage(config: &AppConfig) -> Result<Arc<CacheDb>> {
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    Ok(Arc::new(db))
}

fn network(config: &AppConfig) -> Result<Arc<HttpNetwork>> {
    Ok(Arc::new(HttpNetwork::new(FetchConfig::from(config))?))
}

async fn worker(config: &AppConfig) -> Result<ServiceWorker> {
    Ok(ServiceWorker::from_config(config, open_storage(config).await?, network(config)?)?)
}

pub async fn install(config: &AppConfig) -> Result<Value> {
    let worker = worker(config).await?;
    let cached = worker.install().await?;
    Ok(json!({
        "state": worker.state().await.to_string(),
        "store": worker.manager().names().static_store,
        "cached": cached,
    }))
}

pub async fn activate(config: &AppConfig) -> Result<Value> {
    let worker = worker(config).await?;
    let cached = worker.install().await?;
    let report = worker.activate().await?;
    Ok(json!({
        "state": worker.state().await.to_string(),
        "cached": cached,
        "controls_clients": worker.controls_clients().await,
        "report": report,
    }))
}

/// Route one request through the interceptor, reusing stores from an earlier install.
pub async fn fetch(config: &AppConfig, target: &str, navigate: bool, method: &str) -> Result<Value> {
    let url = resolve(&config.origin_url()?, target)?;
    let mut request = Request::new(method, url);
    if navigate {
        request = request.with_mode(RequestMode::Navigate);
    }

    let interceptor = FetchInterceptor::from_config(config, open_storage(config).await?, network(config)?)?;
    let outcome = match interceptor.handle(&request).await? {
        Intercepted::Passthrough(route) => json!({ "intercepted": false, "route": route }),
        Intercepted::Served { response, resolution } => {
            let content_type = media_type(&response);
            let textual = content_type.is_some_and(|t| t.starts_with("text/") || t.ends_with("json"));
            json!({
                "intercepted": true,
                "resolution": resolution,
                "status": response.status,
                "content_type": content_type,
                "bytes": response.body.len(),
                "body": textual.then(|| response.text()),
            })
        }
    };
    Ok(json!({ "url": request.url.as_str(), "method": request.method, "outcome": outcome }))
}

pub async fn stores(config: &AppConfig, with_entries: bool) -> Result<Value> {
    let storage = open_storage(config).await?;
    let names = config.cache_names();

    let mut stores = Vec::new();
    for name in storage.keys().await? {
        let mut store = json!({ "name": name, "current": names.is_current(&name) });
        if with_entries {
            store["entries"] = json!(storage.entries(&name).await?);
        }
        stores.push(store);
    }
    Ok(json!({ "stores": stores }))
}

pub fn push() -> Result<Value> {
    Ok(serde_json::to_value(notify::push())?)
}

pub async fn delete(config: &AppConfig, budget_id: u64, name: String, phrase: &str, undo: bool) -> Result<Value> {
    let token = config.require_csrf_token()?.to_string();
    let network = network(config)?;
    let api = HttpBudgetApi::new(network.client().clone(), config.origin_url()?, Some(token), &config.ip_lookup_url);
    let view = Arc::new(ConsoleView::single(budget_id));
    let flow = DeleteFlow::new(Arc::new(api), view.clone(), FlowSettings::from(config));

    flow.open(DeleteTarget { budget_id, name, ..Default::default() }).await?;
    flow.set_confirmation(phrase).await;
    let outcome = flow.confirm().await?;

    let restored = match (&outcome, undo) {
        (ConfirmOutcome::Deleted, true) => Some(flow.undo().await?),
        _ => None,
    };

    Ok(json!({
        "budget_id": budget_id,
        "outcome": outcome,
        "undo": restored,
        "events": view.events(),
    }))
}
