//! Redis-backed hash store with automatic reconnection.

use async_trait::async_trait;
use fedgw_types::CacheError;
use redis::{aio::ConnectionManager, AsyncCommands, RedisError};
use std::collections::HashMap;

use super::store::HashStore;
use crate::error::{GatewayError, GatewayResult};

/// Each bucket maps to one Redis hash; the connection manager is cloned per call.
#[derive(Clone)]
pub struct RedisHashStore {
    conn: ConnectionManager,
}

impl RedisHashStore {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> GatewayResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis hash store");
        Ok(Self { conn })
    }
}

fn store_error(bucket: &str, e: RedisError) -> GatewayError {
    CacheError::Store { bucket: bucket.to_string(), message: e.to_string() }.into()
}

#[async_trait]
impl HashStore for RedisHashStore {
    async fn hset(&self, bucket: &str, key: &str, value: Vec<u8>) -> GatewayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(bucket, key, value).await.map_err(|e| store_error(bucket, e))?;
        Ok(())
    }

    async fn hget(&self, bucket: &str, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.hget(bucket, key).await.map_err(|e| store_error(bucket, e))
    }

    async fn hgetall(&self, bucket: &str) -> GatewayResult<HashMap<String, Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.hgetall(bucket).await.map_err(|e| store_error(bucket, e))
    }

    async fn hdel(&self, bucket: &str, key: &str) -> GatewayResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(bucket, key).await.map_err(|e| store_error(bucket, e))?;
        Ok(())
    }
}
