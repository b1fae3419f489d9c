//! Core types and shared functionality for the Wallai offline shell.
//!
//! This crate provides:
//! - Request/response model for intercepted fetches
//! - Named cache stores with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheNames, CacheStorage, MemoryCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, RequestMode, Response};
