//! Cache map over a remote hash store.

use async_trait::async_trait;
use fedgw_types::CacheError;
use std::collections::HashMap;
use std::sync::Arc;

use super::codec::{Deserializer, Payload, Serializer, VersionedCodec};
use super::store::HashStore;
use super::CacheMap;
use crate::error::GatewayResult;

/// Typed view of one bucket: serializes before writes, deserializes after reads.
pub struct RemoteMap<T> {
    store: Arc<dyn HashStore>,
    bucket: String,
    serializer: Arc<dyn Serializer<T>>,
    deserializer: Arc<dyn Deserializer<T>>,
}

impl<T: Payload> RemoteMap<T> {
    /// Map using the versioned envelope codec in both directions.
    pub fn new(store: Arc<dyn HashStore>, bucket: impl Into<String>) -> Self {
        let codec = Arc::new(VersionedCodec::<T>::new());
        Self::with_codec(store, bucket, codec.clone(), codec)
    }
}

impl<T> RemoteMap<T> {
    pub fn with_codec(
        store: Arc<dyn HashStore>,
        bucket: impl Into<String>,
        serializer: Arc<dyn Serializer<T>>,
        deserializer: Arc<dyn Deserializer<T>>,
    ) -> Self {
        Self { store, bucket: bucket.into(), serializer, deserializer }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> CacheMap<T> for RemoteMap<T> {
    async fn set(&self, key: &str, value: &T) -> GatewayResult<()> {
        let raw = self.serializer.serialize(value)?;
        self.store.hset(&self.bucket, key, raw).await
    }

    async fn get(&self, key: &str) -> GatewayResult<T> {
        match self.store.hget(&self.bucket, key).await? {
            Some(raw) => Ok(self.deserializer.deserialize(&raw)?),
            None => Err(CacheError::NotFound { key: key.to_string() }.into()),
        }
    }

    async fn delete(&self, key: &str) -> GatewayResult<()> {
        self.store.hdel(&self.bucket, key).await
    }

    async fn get_all(&self) -> GatewayResult<HashMap<String, T>> {
        let raw_entries = self.store.hgetall(&self.bucket).await?;
        let mut entries = HashMap::with_capacity(raw_entries.len());
        for (key, raw) in raw_entries {
            match self.deserializer.deserialize(&raw) {
                Ok(value) => {
                    entries.insert(key, value);
                },
                Err(e) => {
                    tracing::warn!(
                        bucket = %self.bucket,
                        key = %key,
                        error = %e,
                        "Skipping undecodable cache entry"
                    );
                },
            }
        }
        Ok(entries)
    }

    async fn keys(&self) -> GatewayResult<Vec<String>> {
        Ok(self.store.hgetall(&self.bucket).await?.into_keys().collect())
    }

    async fn delete_all(&self) -> GatewayResult<()> {
        for key in self.keys().await? {
            self.store.hdel(&self.bucket, &key).await?;
        }
        Ok(())
    }
}
