//! Typed error definitions for the federation gateway.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for health/status reporting via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//! - **Composable** via thiserror derive macros

mod cache;
mod config;
mod routing;

pub use cache::CacheError;
pub use config::ConfigError;
pub use routing::RoutingError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a policy cache error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Wraps a shard routing error
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
