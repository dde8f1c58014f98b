//! Policy lookup facade over the three mirrored policy streams.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  PolicyDbClient                                              │
//! │  ├── rules:       RemoteMap<PolicyRule>          ◄─ policydb │
//! │  ├── base_names:  RemoteMap<ChargingRuleNameSet> ◄─ base_names│
//! │  ├── omnipresent: RemoteMap<AssignedPolicies>    ◄─ network_wide_rules
//! │  └── listener_tasks: one ResyncListener task per stream      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads race with resync writes; lookups see an eventually consistent mirror.

use async_trait::async_trait;
use fedgw_types::{AssignedPolicies, ChargingKey, ChargingRuleNameSet, PolicyRule};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cache::{CacheMap, HashStore, RemoteMap};
use crate::error::GatewayResult;
use crate::stream::{
    ResyncListener, StreamClient, StreamListener, BASE_NAMES_STREAM, OMNIPRESENT_RULES_STREAM,
    POLICY_RULES_STREAM,
};

pub const POLICY_RULES_BUCKET: &str = "policydb:rules";
pub const BASE_NAMES_BUCKET: &str = "policydb:base_names";
pub const OMNIPRESENT_RULES_BUCKET: &str = "policydb:omnipresent_rules";

/// Read queries the session controllers need from the policy mirror.
#[async_trait]
pub trait PolicyDb: Send + Sync {
    /// Fails with `NotFound` when the rule is not mirrored.
    async fn get_policy_rule_by_id(&self, id: &str) -> GatewayResult<PolicyRule>;

    /// Charging keys of the charged rules among `static_rule_ids` (resolved through the
    /// mirror) followed by those among `dynamic_rules`. Unknown ids are skipped.
    async fn get_charging_keys_for_rules(
        &self,
        static_rule_ids: &[String],
        dynamic_rules: &[PolicyRule],
    ) -> Vec<ChargingKey>;

    /// Rule ids of all known base names, flattened. Duplicates are kept.
    async fn get_rule_ids_for_base_names(&self, base_names: &[String]) -> Vec<String>;

    async fn get_rule_definitions_for_base_names(&self, base_names: &[String]) -> Vec<PolicyRule>;

    /// `(rule_ids, base_names)` applied to every subscriber.
    async fn get_omnipresent_rules(&self) -> (Vec<String>, Vec<String>);
}

pub struct PolicyDbClient {
    rules: Arc<dyn CacheMap<PolicyRule>>,
    base_names: Arc<dyn CacheMap<ChargingRuleNameSet>>,
    omnipresent: Arc<dyn CacheMap<AssignedPolicies>>,
    listener_tasks: Vec<JoinHandle<()>>,
}

impl PolicyDbClient {
    /// Mirror the three policy streams into `store` and start streaming.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn HashStore>, stream_client: Arc<dyn StreamClient>) -> Self {
        Self::with_mirrors(
            Arc::new(RemoteMap::<PolicyRule>::new(store.clone(), POLICY_RULES_BUCKET)),
            Arc::new(RemoteMap::<ChargingRuleNameSet>::new(store.clone(), BASE_NAMES_BUCKET)),
            Arc::new(RemoteMap::<AssignedPolicies>::new(store, OMNIPRESENT_RULES_BUCKET)),
            stream_client,
        )
    }

    pub fn with_mirrors(
        rules: Arc<dyn CacheMap<PolicyRule>>,
        base_names: Arc<dyn CacheMap<ChargingRuleNameSet>>,
        omnipresent: Arc<dyn CacheMap<AssignedPolicies>>,
        stream_client: Arc<dyn StreamClient>,
    ) -> Self {
        let listeners: Vec<Arc<dyn StreamListener>> = vec![
            Arc::new(ResyncListener::new(BASE_NAMES_STREAM, base_names.clone())),
            Arc::new(ResyncListener::new(POLICY_RULES_STREAM, rules.clone())),
            Arc::new(ResyncListener::new(OMNIPRESENT_RULES_STREAM, omnipresent.clone())),
        ];
        let listener_tasks = listeners
            .into_iter()
            .map(|listener| spawn_listener(Arc::clone(&stream_client), listener))
            .collect();

        Self { rules, base_names, omnipresent, listener_tasks }
    }
}

impl Drop for PolicyDbClient {
    fn drop(&mut self) {
        for task in &self.listener_tasks {
            task.abort();
        }
    }
}

fn spawn_listener(
    client: Arc<dyn StreamClient>,
    listener: Arc<dyn StreamListener>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = listener.name().to_string();
        tracing::info!(stream = %name, "Starting policy stream listener");
        match client.stream(listener).await {
            Ok(()) => tracing::warn!(stream = %name, "Policy stream ended"),
            Err(e) => tracing::error!(stream = %name, error = %e, "Policy stream failed"),
        }
    })
}

#[async_trait]
impl PolicyDb for PolicyDbClient {
    async fn get_policy_rule_by_id(&self, id: &str) -> GatewayResult<PolicyRule> {
        self.rules.get(id).await
    }

    async fn get_charging_keys_for_rules(
        &self,
        static_rule_ids: &[String],
        dynamic_rules: &[PolicyRule],
    ) -> Vec<ChargingKey> {
        let mut keys = Vec::new();
        for id in static_rule_ids {
            match self.rules.get(id).await {
                Ok(rule) => keys.extend(ChargingKey::from_rule(&rule)),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "Skipping unknown static rule");
                },
            }
        }
        keys.extend(dynamic_rules.iter().filter_map(ChargingKey::from_rule));
        keys
    }

    async fn get_rule_ids_for_base_names(&self, base_names: &[String]) -> Vec<String> {
        let mut rule_ids = Vec::new();
        for name in base_names {
            match self.base_names.get(name).await {
                Ok(set) => rule_ids.extend(set.rule_names),
                Err(e) => {
                    tracing::warn!(base_name = %name, error = %e, "Skipping unknown base name");
                },
            }
        }
        rule_ids
    }

    async fn get_rule_definitions_for_base_names(&self, base_names: &[String]) -> Vec<PolicyRule> {
        let mut rules = Vec::new();
        for id in self.get_rule_ids_for_base_names(base_names).await {
            match self.rules.get(&id).await {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "Base name references unknown rule");
                },
            }
        }
        rules
    }

    async fn get_omnipresent_rules(&self) -> (Vec<String>, Vec<String>) {
        let entries: BTreeMap<String, AssignedPolicies> = match self.omnipresent.get_all().await {
            Ok(entries) => entries.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read omnipresent rules");
                return (Vec::new(), Vec::new());
            },
        };
        if entries.len() > 1 {
            tracing::warn!(count = entries.len(), "Expected a single omnipresent rules entry");
        }
        match entries.into_values().next() {
            Some(assigned) => (assigned.assigned_policies, assigned.assigned_base_names),
            None => (Vec::new(), Vec::new()),
        }
    }
}
