//! # Federation Gateway Types
//!
//! Core types, models, and error definitions for the federation gateway.
//!
//! This crate provides the foundational type system shared by the gateway:
//!
//! - **`error`** - Typed error hierarchy for the policy cache, shard routing and configuration
//! - **`models`** - Domain models (policy rules, session messages, gateway configuration)
//!
//! ## Architecture Role
//!
//! `fedgw-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                fedgw-types (this crate)
//!                        │
//!                        ▼
//!                   fedgw-core
//!      (policy mirror, multiplexor, session routing)
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for storage and the backend wire
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{CacheError, ConfigError, Result, RoutingError, TypedError};

// Re-export core model types
pub use models::{
    AssignedPolicies, ChargingKey, ChargingRuleNameSet, CreateSessionRequest,
    CreateSessionResponse, DisableMessage, GatewayConfig, HealthConfig, HealthStatus,
    PolicyRule, ServiceHealth, ServiceIdentifier, SessionControllerConfig,
    SessionTerminateRequest, SessionTerminateResponse, StaticRuleInstall, StoreConfig,
    TrackingType, UpdateSessionRequest, UpdateSessionResponse,
};
