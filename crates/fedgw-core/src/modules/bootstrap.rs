//! Wire a loaded configuration into running gateway services.

use fedgw_types::{GatewayConfig, StoreConfig};
use std::sync::Arc;

use super::logger::init_logging;
use crate::cache::{HashStore, MemoryHashStore, RedisHashStore};
use crate::error::GatewayResult;
use crate::policydb::{PolicyDb, PolicyDbClient};
use crate::session_proxy::CentralSessionControllers;
use crate::stream::StreamClient;

/// Redis when a URL is configured, the in-process store otherwise.
pub async fn store_from_config(config: &StoreConfig) -> GatewayResult<Arc<dyn HashStore>> {
    match &config.redis_url {
        Some(url) => Ok(Arc::new(RedisHashStore::connect(url).await?)),
        None => {
            tracing::info!("No Redis URL configured, mirroring policies in process");
            Ok(Arc::new(MemoryHashStore::new()))
        },
    }
}

/// Policy mirror plus the session controllers routing over it.
pub struct Gateway {
    pub policy_db: Arc<PolicyDbClient>,
    pub controllers: CentralSessionControllers,
}

impl Gateway {
    /// Install logging at `config.log_level`, open the policy store, start mirroring
    /// the policy streams and build one controller per configured shard.
    pub async fn start(
        config: &GatewayConfig,
        stream_client: Arc<dyn StreamClient>,
    ) -> GatewayResult<Self> {
        init_logging(&config.log_level);

        let store = store_from_config(&config.store).await?;
        let policy_db = Arc::new(PolicyDbClient::new(store, stream_client));
        let controllers = CentralSessionControllers::from_config(
            config,
            Arc::clone(&policy_db) as Arc<dyn PolicyDb>,
        )?;

        tracing::info!(controllers = controllers.len(), "Gateway started");
        Ok(Self { policy_db, controllers })
    }
}
