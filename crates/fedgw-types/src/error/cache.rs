//! Policy cache errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by cache maps and the storage codec.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum CacheError {
    /// No entry stored under the key
    #[error("No value found for key {key}")]
    NotFound { key: String },

    /// Stored or offered value is not of the expected kind
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Envelope or payload bytes could not be decoded
    #[error("Failed to decode {what}: {message}")]
    DecodeError { what: String, message: String },

    /// Payload could not be encoded for storage
    #[error("Failed to encode {what}: {message}")]
    EncodeError { what: String, message: String },

    /// The backing hash store rejected the operation
    #[error("Store error on bucket {bucket}: {message}")]
    Store { bucket: String, message: String },
}

impl CacheError {
    /// Build a decode error from any displayable cause.
    pub fn decode(what: &str, cause: impl std::fmt::Display) -> Self {
        Self::DecodeError { what: what.to_string(), message: cause.to_string() }
    }

    /// Check if this error means the key is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
