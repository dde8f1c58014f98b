//! Session control messages exchanged with the local session manager and the backends.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::policy::PolicyRule;

// ============================================================================
// Create / Terminate
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default)]
    pub apn: String,
    #[serde(default)]
    pub msisdn: String,
    #[serde(default)]
    pub rat_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_ipv4: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRuleInstall {
    pub rule_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRuleInstall {
    pub policy_rule: PolicyRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub static_rules: Vec<StaticRuleInstall>,
    #[serde(default)]
    pub dynamic_rules: Vec<DynamicRuleInstall>,
    #[serde(default)]
    pub credits: Vec<CreditUpdateResponse>,
    #[serde(default)]
    pub usage_monitors: Vec<UsageMonitoringUpdateResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTerminateRequest {
    #[serde(default)]
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default)]
    pub credit_usages: Vec<CreditUsage>,
    #[serde(default)]
    pub monitor_usages: Vec<UsageMonitorUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTerminateResponse {
    pub subscriber_id: String,
    pub session_id: String,
}

// ============================================================================
// Update
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditUsageType {
    #[default]
    Threshold,
    QuotaExhausted,
    ValidityTimerExpired,
    Terminated,
    Reauth,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUsage {
    pub charging_key: u32,
    #[serde(default)]
    pub bytes_tx: u64,
    #[serde(default)]
    pub bytes_rx: u64,
    #[serde(default, rename = "type")]
    pub usage_type: CreditUsageType,
}

/// One subscriber's charging usage report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUsageUpdate {
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default)]
    pub request_number: u32,
    pub usage: CreditUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitoringLevel {
    #[default]
    SessionLevel,
    PccRuleLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMonitorUpdate {
    pub monitoring_key: String,
    #[serde(default)]
    pub level: MonitoringLevel,
    #[serde(default)]
    pub bytes_tx: u64,
    #[serde(default)]
    pub bytes_rx: u64,
}

/// One subscriber's usage monitor report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMonitoringUpdateRequest {
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default)]
    pub request_number: u32,
    pub update: UsageMonitorUpdate,
}

/// Entries may belong to subscribers served by different controllers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub updates: Vec<CreditUsageUpdate>,
    #[serde(default)]
    pub usage_monitors: Vec<UsageMonitoringUpdateRequest>,
}

impl UpdateSessionRequest {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.usage_monitors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUnits {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedUnits {
    #[serde(default)]
    pub total: CreditUnits,
    #[serde(default)]
    pub tx: CreditUnits,
    #[serde(default)]
    pub rx: CreditUnits,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUpdateResponse {
    pub success: bool,
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default)]
    pub charging_key: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granted_units: Option<GrantedUnits>,
    #[serde(default)]
    pub result_code: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMonitoringCredit {
    pub monitoring_key: String,
    #[serde(default)]
    pub level: MonitoringLevel,
    #[serde(default)]
    pub granted_units: GrantedUnits,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMonitoringUpdateResponse {
    pub success: bool,
    pub subscriber_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit: Option<UsageMonitoringCredit>,
    #[serde(default)]
    pub rules_to_remove: Vec<String>,
    #[serde(default)]
    pub static_rules_to_install: Vec<StaticRuleInstall>,
    #[serde(default)]
    pub result_code: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSessionResponse {
    #[serde(default)]
    pub responses: Vec<CreditUpdateResponse>,
    #[serde(default)]
    pub usage_monitor_responses: Vec<UsageMonitoringUpdateResponse>,
}

impl UpdateSessionResponse {
    /// Append another controller's answers, keeping arrival order.
    pub fn merge(&mut self, other: UpdateSessionResponse) {
        self.responses.extend(other.responses);
        self.usage_monitor_responses.extend(other.usage_monitor_responses);
    }
}

// ============================================================================
// Service management
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableMessage {
    pub disable_period_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceHealth {
    #[default]
    Healthy,
    Unhealthy,
}

impl fmt::Display for ServiceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceHealth::Healthy => write!(f, "HEALTHY"),
            ServiceHealth::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub health: ServiceHealth,
    #[serde(default)]
    pub health_message: String,
}

impl HealthStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self { health: ServiceHealth::Healthy, health_message: message.into() }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self { health: ServiceHealth::Unhealthy, health_message: message.into() }
    }

    pub fn is_healthy(&self) -> bool {
        self.health == ServiceHealth::Healthy
    }
}
