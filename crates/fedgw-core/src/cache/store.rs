//! Hash-map stores backing the remote cache maps.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use crate::error::GatewayResult;

/// The four primitives a remote hash-map store must offer.
///
/// A bucket is one named hash; keys and values inside it are opaque strings/bytes.
#[async_trait]
pub trait HashStore: Send + Sync {
    async fn hset(&self, bucket: &str, key: &str, value: Vec<u8>) -> GatewayResult<()>;

    /// `Ok(None)` when the key is absent.
    async fn hget(&self, bucket: &str, key: &str) -> GatewayResult<Option<Vec<u8>>>;

    async fn hgetall(&self, bucket: &str) -> GatewayResult<HashMap<String, Vec<u8>>>;

    async fn hdel(&self, bucket: &str, key: &str) -> GatewayResult<()>;
}

/// Process-local store, one concurrent map per bucket.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    buckets: DashMap<String, DashMap<String, Vec<u8>>>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held in a bucket.
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets.get(bucket).map(|b| b.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HashStore for MemoryHashStore {
    async fn hset(&self, bucket: &str, key: &str, value: Vec<u8>) -> GatewayResult<()> {
        self.buckets.entry(bucket.to_string()).or_default().insert(key.to_string(), value);
        Ok(())
    }

    async fn hget(&self, bucket: &str, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        Ok(self.buckets.get(bucket).and_then(|b| b.get(key).map(|v| v.value().clone())))
    }

    async fn hgetall(&self, bucket: &str) -> GatewayResult<HashMap<String, Vec<u8>>> {
        Ok(self
            .buckets
            .get(bucket)
            .map(|b| b.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
            .unwrap_or_default())
    }

    async fn hdel(&self, bucket: &str, key: &str) -> GatewayResult<()> {
        if let Some(b) = self.buckets.get(bucket) {
            b.remove(key);
        }
        Ok(())
    }
}
