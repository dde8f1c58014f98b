//! Policy cache maps.
//!
//! ```text
//! CacheMap<T> ──► RemoteMap<T> ──► Serializer / Deserializer (VersionedCodec<T>)
//!                      │
//!                      ▼
//!                 HashStore (MemoryHashStore | RedisHashStore)
//! ```

mod codec;
mod redis_store;
mod remote;
mod store;

pub use codec::{Deserializer, Payload, Serializer, VersionedCodec, SCHEMA_VERSION};
pub use redis_store::RedisHashStore;
pub use remote::RemoteMap;
pub use store::{HashStore, MemoryHashStore};

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::GatewayResult;

/// Key/value map with typed values.
///
/// `get_all` is best-effort and `delete_all` is not atomic; callers mirroring an
/// external source rely on the next full resync to repair partial states.
#[async_trait]
pub trait CacheMap<T>: Send + Sync {
    async fn set(&self, key: &str, value: &T) -> GatewayResult<()>;

    /// Fails with `CacheError::NotFound` when the key is absent.
    async fn get(&self, key: &str) -> GatewayResult<T>;

    async fn delete(&self, key: &str) -> GatewayResult<()>;

    async fn get_all(&self) -> GatewayResult<HashMap<String, T>>;

    async fn keys(&self) -> GatewayResult<Vec<String>>;

    async fn delete_all(&self) -> GatewayResult<()>;
}
