//! Shard routing errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while selecting a session controller shard.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum RoutingError {
    /// Subscriber or session id does not carry a numeric IMSI
    #[error("Invalid subscriber id {id}: {reason}")]
    InvalidSubscriber { id: String, reason: String },

    /// Computed shard does not exist
    #[error("Controller index {index} out of range for {total} controllers")]
    OutOfRange { index: usize, total: usize },

    /// Request lacks the identifier needed to route it
    #[error("Missing {field} in request")]
    MissingField { field: String },
}

impl RoutingError {
    pub fn invalid_subscriber(id: &str, reason: &str) -> Self {
        Self::InvalidSubscriber { id: id.to_string(), reason: reason.to_string() }
    }

    pub fn missing(field: &str) -> Self {
        Self::MissingField { field: field.to_string() }
    }
}
