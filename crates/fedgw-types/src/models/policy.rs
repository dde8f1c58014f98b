//! Policy rule models mirrored from the orchestrator.

use serde::{Deserialize, Serialize};

/// How usage of a rule is tracked and charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingType {
    /// Usage monitored by the policy server only
    #[default]
    OnlyPcrf,
    /// Usage charged by the online charging system only
    OnlyOcs,
    /// Usage both monitored and charged
    OcsAndPcrf,
    /// Neither monitored nor charged
    NoTracking,
}

impl TrackingType {
    /// Rules with these tracking types need a charging key.
    pub fn requires_charging(self) -> bool {
        matches!(self, TrackingType::OnlyOcs | TrackingType::OcsAndPcrf)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowDirection {
    #[default]
    Uplink,
    Downlink,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowAction {
    #[default]
    Permit,
    Deny,
}

/// Packet match criteria. Address fields hold already-parsed flow descriptor parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(default)]
    pub direction: FlowDirection,
    #[serde(default)]
    pub ip_proto: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_dst: Option<String>,
    #[serde(default)]
    pub src_port: u32,
    #[serde(default)]
    pub dst_port: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDescription {
    #[serde(rename = "match")]
    pub flow_match: FlowMatch,
    #[serde(default)]
    pub action: FlowAction,
}

/// QoS parameters attached to a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowQos {
    pub qci: u32,
    #[serde(default)]
    pub max_req_bw_ul: u32,
    #[serde(default)]
    pub max_req_bw_dl: u32,
    #[serde(default)]
    pub gbr_ul: u32,
    #[serde(default)]
    pub gbr_dl: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedirectAddressType {
    #[default]
    Ipv4,
    Ipv6,
    Url,
    SipUri,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectInformation {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub address_type: RedirectAddressType,
    pub server_address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentifier {
    pub value: u32,
}

/// A charging/policy rule as distributed by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub rating_group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_identifier: Option<ServiceIdentifier>,
    #[serde(default)]
    pub flow_list: Vec<FlowDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<FlowQos>,
    #[serde(default)]
    pub tracking_type: TrackingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_key: Option<String>,
    #[serde(default)]
    pub hard_timeout_secs: u64,
}

/// Charging bucket a rule's usage is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChargingKey {
    pub rating_group: u32,
    pub service_id_tracking: bool,
    pub service_identifier: u32,
}

impl ChargingKey {
    /// Derive the charging key of a rule, if its tracking type is charged at all.
    pub fn from_rule(rule: &PolicyRule) -> Option<Self> {
        if !rule.tracking_type.requires_charging() {
            return None;
        }
        let (service_id_tracking, service_identifier) = match rule.service_identifier {
            Some(sid) => (true, sid.value),
            None => (false, 0),
        };
        Some(Self { rating_group: rule.rating_group, service_id_tracking, service_identifier })
    }
}

/// Rule names grouped under a base name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingRuleNameSet {
    #[serde(default)]
    pub rule_names: Vec<String>,
}

/// Rules and base names applied to every subscriber of the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedPolicies {
    #[serde(default)]
    pub assigned_policies: Vec<String>,
    #[serde(default)]
    pub assigned_base_names: Vec<String>,
}
