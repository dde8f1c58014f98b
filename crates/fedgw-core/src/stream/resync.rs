//! Listener reconciling a cache map to full-resync batches.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{DataUpdateBatch, StreamListener};
use crate::cache::CacheMap;

/// Mirrors one stream into a cache map.
///
/// After each resync batch the mirror's key set equals the batch's key set. Keys whose
/// value fails to decode are skipped, so a previously mirrored entry for such a key is
/// pruned along with the keys missing from the batch. Incremental batches are ignored.
pub struct ResyncListener<T> {
    name: String,
    mirror: Arc<dyn CacheMap<T>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> ResyncListener<T> {
    pub fn new(name: impl Into<String>, mirror: Arc<dyn CacheMap<T>>) -> Self {
        Self { name: name.into(), mirror, _payload: PhantomData }
    }
}

#[async_trait]
impl<T> StreamListener for ResyncListener<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn update(&self, batch: DataUpdateBatch) -> bool {
        if !batch.resync {
            tracing::debug!(stream = %self.name, "Ignoring non-resync batch");
            return true;
        }

        let mut stale: HashSet<String> = match self.mirror.keys().await {
            Ok(keys) => keys.into_iter().collect(),
            Err(e) => {
                tracing::warn!(
                    stream = %self.name,
                    error = %e,
                    "Could not list mirrored keys, stale entries survive this resync"
                );
                HashSet::new()
            },
        };

        let total = batch.updates.len();
        let mut applied = 0usize;
        for update in batch.updates {
            let value: T = match serde_json::from_slice(&update.value) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(
                        stream = %self.name,
                        key = %update.key,
                        error = %e,
                        "Failed to decode streamed value"
                    );
                    continue;
                },
            };
            if let Err(e) = self.mirror.set(&update.key, &value).await {
                tracing::error!(
                    stream = %self.name,
                    key = %update.key,
                    error = %e,
                    "Failed to store streamed value"
                );
                continue;
            }
            stale.remove(&update.key);
            applied += 1;
        }

        let mut pruned = 0usize;
        for key in stale {
            match self.mirror.delete(&key).await {
                Ok(()) => pruned += 1,
                Err(e) => {
                    tracing::error!(
                        stream = %self.name,
                        key = %key,
                        error = %e,
                        "Failed to prune stale key"
                    );
                },
            }
        }

        tracing::info!(stream = %self.name, total, applied, pruned, "Applied resync batch");
        true
    }

    fn report_error(&self, error: &str) {
        tracing::error!(
            stream = %self.name,
            error = %error,
            "Stream reported an error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{HashStore, MemoryHashStore, RemoteMap};
    use crate::stream::DataUpdate;
    use fedgw_types::ChargingRuleNameSet;
    use std::collections::HashMap;

    fn names(list: &[&str]) -> ChargingRuleNameSet {
        ChargingRuleNameSet { rule_names: list.iter().map(|s| s.to_string()).collect() }
    }

    fn encoded(list: &[&str]) -> Vec<u8> {
        serde_json::to_vec(&names(list)).unwrap()
    }

    fn setup() -> (Arc<dyn CacheMap<ChargingRuleNameSet>>, ResyncListener<ChargingRuleNameSet>) {
        let store: Arc<dyn HashStore> = Arc::new(MemoryHashStore::new());
        let mirror: Arc<dyn CacheMap<ChargingRuleNameSet>> =
            Arc::new(RemoteMap::new(store, "base_names"));
        let listener = ResyncListener::new("base_names", mirror.clone());
        (mirror, listener)
    }

    async fn contents(
        mirror: &Arc<dyn CacheMap<ChargingRuleNameSet>>,
    ) -> HashMap<String, ChargingRuleNameSet> {
        mirror.get_all().await.unwrap()
    }

    #[tokio::test]
    async fn test_resync_converges_to_batch() {
        let (mirror, listener) = setup();
        mirror.set("a", &names(&["old-a"])).await.unwrap();
        mirror.set("b", &names(&["old-b"])).await.unwrap();
        mirror.set("c", &names(&["old-c"])).await.unwrap();

        let batch = DataUpdateBatch::resync(vec![
            DataUpdate::new("a", encoded(&["new-a"])),
            DataUpdate::new("c", encoded(&["new-c1", "new-c2"])),
        ]);
        assert!(listener.update(batch).await);

        let all = contents(&mirror).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], names(&["new-a"]));
        assert_eq!(all["c"], names(&["new-c1", "new-c2"]));
        assert!(!all.contains_key("b"));
    }

    #[tokio::test]
    async fn test_resync_is_idempotent() {
        let (mirror, listener) = setup();
        let batch = DataUpdateBatch::resync(vec![
            DataUpdate::new("a", encoded(&["r1"])),
            DataUpdate::new("b", encoded(&["r2", "r3"])),
        ]);

        assert!(listener.update(batch.clone()).await);
        let once = contents(&mirror).await;
        assert!(listener.update(batch).await);
        assert_eq!(contents(&mirror).await, once);
    }

    #[tokio::test]
    async fn test_non_resync_batch_is_ignored() {
        let (mirror, listener) = setup();
        mirror.set("a", &names(&["r1"])).await.unwrap();

        let batch = DataUpdateBatch {
            updates: vec![DataUpdate::new("b", encoded(&["r2"]))],
            resync: false,
        };
        assert!(listener.update(batch).await);

        let all = contents(&mirror).await;
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("a"));
    }

    #[tokio::test]
    async fn test_undecodable_key_is_skipped() {
        let (mirror, listener) = setup();
        mirror.set("bad", &names(&["previous"])).await.unwrap();

        let batch = DataUpdateBatch::resync(vec![
            DataUpdate::new("good", encoded(&["r1"])),
            DataUpdate::new("bad", b"{not json".to_vec()),
        ]);
        assert!(listener.update(batch).await);

        let all = contents(&mirror).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all["good"], names(&["r1"]));
    }

    #[tokio::test]
    async fn test_empty_resync_clears_mirror() {
        let (mirror, listener) = setup();
        mirror.set("a", &names(&["r1"])).await.unwrap();

        assert!(listener.update(DataUpdateBatch::resync(vec![])).await);
        assert!(contents(&mirror).await.is_empty());
    }
}
