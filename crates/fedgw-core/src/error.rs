//! Unified error types for the gateway core.

use fedgw_types::{CacheError, ConfigError, RoutingError, TypedError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main error type for all gateway operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// Policy cache lookup, decode or store failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Shard selection failed.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Remote hash store failure (Redis).
    #[error("Store error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Network request to a backend failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend response body was not the expected JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// OAuth token acquisition failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Backend answered with a non-success status.
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Backend call exceeded its deadline.
    #[error("Request to controller {shard} timed out after {timeout_ms}ms")]
    Timeout { shard: usize, timeout_ms: u64 },

    /// Caller supplied an unusable request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Several controllers failed; see [`MultiError`].
    #[error(transparent)]
    Multi(#[from] MultiError),

    /// Broken internal invariant (task join failure, closed channel).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<TypedError> for GatewayError {
    fn from(e: TypedError) -> Self {
        match e {
            TypedError::Cache(e) => Self::Cache(e),
            TypedError::Routing(e) => Self::Routing(e),
            TypedError::Config(e) => Self::Config(e),
        }
    }
}

impl Serialize for GatewayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors collected from several controllers, keyed by controller index.
#[derive(Debug, Default, Error)]
pub struct MultiError {
    errors: Vec<(usize, GatewayError)>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, shard: usize, error: GatewayError) {
        self.errors.push((shard, error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[(usize, GatewayError)] {
        &self.errors
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> GatewayResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::Multi(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} controller(s) failed:", self.errors.len())?;
        for (shard, error) in &self.errors {
            write!(f, " [controller {}: {}]", shard, error)?;
        }
        Ok(())
    }
}
