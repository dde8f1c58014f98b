#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use fedgw_core::cache::{CacheMap, RemoteMap};
use fedgw_core::policydb::{PolicyDb, POLICY_RULES_BUCKET};
use fedgw_core::stream::{
    DataUpdate, DataUpdateBatch, BASE_NAMES_STREAM, OMNIPRESENT_RULES_STREAM, POLICY_RULES_STREAM,
};
use fedgw_core::{ChannelStreamClient, HashStore, MemoryHashStore, PolicyDbClient};
use fedgw_types::{AssignedPolicies, ChargingKey, ChargingRuleNameSet, PolicyRule, TrackingType};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

fn rule(id: &str, rating_group: u32, tracking_type: TrackingType) -> PolicyRule {
    PolicyRule { id: id.to_string(), rating_group, tracking_type, ..Default::default() }
}

fn entry<T: serde::Serialize>(key: &str, value: &T) -> DataUpdate {
    DataUpdate::new(key, serde_json::to_vec(value).expect("serializable"))
}

/// Poll `check` until it holds; streamed batches are applied by background tasks.
async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

#[tokio::test]
async fn test_streams_feed_policy_lookups() {
    let store = Arc::new(MemoryHashStore::new());
    let streams = Arc::new(ChannelStreamClient::new());
    let policy_db = PolicyDbClient::new(store.clone(), streams.clone());

    streams
        .publish(
            POLICY_RULES_STREAM,
            DataUpdateBatch::resync(vec![
                entry("charged", &rule("charged", 2, TrackingType::OnlyOcs)),
                entry("free", &rule("free", 3, TrackingType::NoTracking)),
                entry("stale", &rule("stale", 4, TrackingType::OnlyOcs)),
            ]),
        )
        .await
        .expect("publish rules");
    streams
        .publish(
            BASE_NAMES_STREAM,
            DataUpdateBatch::resync(vec![entry(
                "base",
                &ChargingRuleNameSet { rule_names: vec!["charged".to_string()] },
            )]),
        )
        .await
        .expect("publish base names");
    streams
        .publish(
            OMNIPRESENT_RULES_STREAM,
            DataUpdateBatch::resync(vec![entry(
                "network_wide",
                &AssignedPolicies {
                    assigned_policies: vec!["free".to_string()],
                    assigned_base_names: vec!["base".to_string()],
                },
            )]),
        )
        .await
        .expect("publish omnipresent rules");

    let db = &policy_db;
    eventually("all three mirrors", || async move {
        db.get_policy_rule_by_id("stale").await.is_ok()
            && !db.get_rule_ids_for_base_names(&["base".to_string()]).await.is_empty()
            && !db.get_omnipresent_rules().await.0.is_empty()
    })
    .await;

    let keys = policy_db
        .get_charging_keys_for_rules(&["charged".to_string(), "free".to_string()], &[])
        .await;
    assert_eq!(
        keys,
        vec![ChargingKey { rating_group: 2, service_id_tracking: false, service_identifier: 0 }]
    );
    assert_eq!(
        policy_db.get_omnipresent_rules().await,
        (vec!["free".to_string()], vec!["base".to_string()])
    );

    // A new resync without "stale" prunes it from the mirror.
    streams
        .publish(
            POLICY_RULES_STREAM,
            DataUpdateBatch::resync(vec![
                entry("charged", &rule("charged", 20, TrackingType::OnlyOcs)),
                entry("free", &rule("free", 3, TrackingType::NoTracking)),
            ]),
        )
        .await
        .expect("publish second resync");

    eventually("stale rule removal", || async move {
        db.get_policy_rule_by_id("stale").await.is_err()
    })
    .await;
    let charged = policy_db.get_policy_rule_by_id("charged").await.expect("charged rule");
    assert_eq!(charged.rating_group, 20);

    let raw: Arc<dyn HashStore> = store;
    let mirrored = RemoteMap::<PolicyRule>::new(raw, POLICY_RULES_BUCKET);
    let mut keys = mirrored.keys().await.expect("list keys");
    keys.sort();
    assert_eq!(keys, vec!["charged".to_string(), "free".to_string()]);
}

#[tokio::test]
async fn test_incremental_batches_are_ignored() {
    let streams = Arc::new(ChannelStreamClient::new());
    let policy_db = PolicyDbClient::new(Arc::new(MemoryHashStore::new()), streams.clone());

    let incremental = DataUpdateBatch {
        updates: vec![entry("ignored", &rule("ignored", 1, TrackingType::OnlyOcs))],
        resync: false,
    };
    streams.publish(POLICY_RULES_STREAM, incremental).await.expect("publish incremental");
    streams
        .publish(
            POLICY_RULES_STREAM,
            DataUpdateBatch::resync(vec![entry("kept", &rule("kept", 1, TrackingType::OnlyOcs))]),
        )
        .await
        .expect("publish resync");

    let db = &policy_db;
    eventually("resync batch", || async move { db.get_policy_rule_by_id("kept").await.is_ok() })
        .await;
    assert!(policy_db.get_policy_rule_by_id("ignored").await.is_err());
}
