//! Gateway configuration models.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Session controllers
// ============================================================================

/// Connection settings for one backend policy server (one shard).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SessionControllerConfig {
    /// Backend API root, e.g. `https://pcf.example.net/npcf-smpolicycontrol/v1`
    #[validate(url)]
    pub api_root: String,
    /// OAuth2 token endpoint
    #[validate(url)]
    pub token_url: String,
    /// OAuth2 client credentials
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Skip the backend entirely and answer locally
    #[serde(default)]
    pub disable_backend: bool,
    /// Per-request deadline in milliseconds
    #[validate(range(min = 1))]
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SessionControllerConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

/// Thresholds for judging a controller unhealthy from its request failure ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct HealthConfig {
    /// Minimum requests in a sampling window before the ratio is considered
    #[serde(default = "default_minimum_request_threshold")]
    pub minimum_request_threshold: u64,
    /// Failure ratio (0.0-1.0) at or above which the controller is unhealthy
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_request_failure_threshold")]
    pub request_failure_threshold: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            minimum_request_threshold: default_minimum_request_threshold(),
            request_failure_threshold: default_request_failure_threshold(),
        }
    }
}

// ============================================================================
// Store & top level
// ============================================================================

/// Where mirrored policy data is kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct StoreConfig {
    /// Redis URL; the in-process store is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GatewayConfig {
    /// One entry per shard, in shard index order
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub controllers: Vec<SessionControllerConfig>,
    #[serde(default)]
    #[validate(nested)]
    pub health: HealthConfig,
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,
    /// Default tracing filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_minimum_request_threshold() -> u64 {
    1
}

fn default_request_failure_threshold() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}
