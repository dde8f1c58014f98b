//! Core domain models for the federation gateway.
//!
//! This module contains the data structures shared between the policy mirror,
//! the session routing layer and the configuration loader.

mod config;
mod policy;
mod session;

// Re-export all models
pub use config::{GatewayConfig, HealthConfig, SessionControllerConfig, StoreConfig};
pub use policy::{
    AssignedPolicies, ChargingKey, ChargingRuleNameSet, FlowAction, FlowDescription, FlowDirection,
    FlowMatch, FlowQos, PolicyRule, RedirectAddressType, RedirectInformation, ServiceIdentifier,
    TrackingType,
};
pub use session::{
    CreateSessionRequest, CreateSessionResponse, CreditUnits, CreditUpdateResponse, CreditUsage,
    CreditUsageType, CreditUsageUpdate, DisableMessage, DynamicRuleInstall, GrantedUnits,
    HealthStatus, MonitoringLevel, ServiceHealth, SessionTerminateRequest,
    SessionTerminateResponse, StaticRuleInstall, UpdateSessionRequest, UpdateSessionResponse,
    UsageMonitorUpdate, UsageMonitoringCredit, UsageMonitoringUpdateRequest,
    UsageMonitoringUpdateResponse,
};
