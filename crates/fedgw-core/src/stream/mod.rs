//! Push-stream subscription contract and the resync mirror listener.

mod channel;
mod resync;

pub use channel::{ChannelStreamClient, StreamEvent};
pub use resync::ResyncListener;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::GatewayResult;

/// Stream carrying base name → rule names sets.
pub const BASE_NAMES_STREAM: &str = "base_names";
/// Stream carrying policy rule definitions.
pub const POLICY_RULES_STREAM: &str = "policydb";
/// Stream carrying the network-wide (omnipresent) assignment.
pub const OMNIPRESENT_RULES_STREAM: &str = "network_wide_rules";

/// One key of a streamed batch; `value` is the stream's JSON encoding of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUpdate {
    pub key: String,
    pub value: Vec<u8>,
}

impl DataUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataUpdateBatch {
    pub updates: Vec<DataUpdate>,
    /// The batch is the complete current content of the stream
    pub resync: bool,
}

impl DataUpdateBatch {
    pub fn resync(updates: Vec<DataUpdate>) -> Self {
        Self { updates, resync: true }
    }
}

/// Receiver side of a named update stream.
#[async_trait]
pub trait StreamListener: Send + Sync {
    fn name(&self) -> &str;

    /// Optional subscription arguments sent along with the stream request.
    fn extra_args(&self) -> Option<serde_json::Value> {
        None
    }

    /// Apply a batch. Returning `false` ends the subscription.
    async fn update(&self, batch: DataUpdateBatch) -> bool;

    fn report_error(&self, error: &str);
}

/// Transport that delivers batches to a listener until the stream ends.
#[async_trait]
pub trait StreamClient: Send + Sync {
    async fn stream(&self, listener: Arc<dyn StreamListener>) -> GatewayResult<()>;
}
