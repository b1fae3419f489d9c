//! Client code for the Wallai offline shell.
//!
//! This crate provides the network boundary, the offline worker (precache,
//! activation and fetch interception) and the budget delete/undo flow.

pub mod budgets;
pub mod fetch;
pub mod worker;

#[cfg(test)]
mod testing;

pub use budgets::{BudgetApi, BudgetView, DeleteFlow, HttpBudgetApi};
pub use fetch::{FetchConfig, HttpNetwork, Network};
pub use worker::{CacheManager, FetchInterceptor, Intercepted, Resolution, ServiceWorker, WorkerState};
