//! In-process stream transport over tokio channels.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{DataUpdateBatch, StreamClient, StreamListener};
use crate::error::{GatewayError, GatewayResult};

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Batch(DataUpdateBatch),
    Error(String),
}

struct StreamChannel {
    tx: Option<mpsc::Sender<StreamEvent>>,
    rx: Option<mpsc::Receiver<StreamEvent>>,
}

impl StreamChannel {
    fn open(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self { tx: Some(tx), rx: Some(rx) }
    }
}

/// Delivers published events to the single listener subscribed to each stream name.
///
/// Embedders bridge their own subscription transport by publishing into it.
pub struct ChannelStreamClient {
    channels: DashMap<String, StreamChannel>,
    capacity: usize,
}

impl Default for ChannelStreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelStreamClient {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { channels: DashMap::new(), capacity: capacity.max(1) }
    }

    /// Sender for a stream, creating the stream on first use.
    pub fn publisher(&self, stream: &str) -> GatewayResult<mpsc::Sender<StreamEvent>> {
        let channel = self
            .channels
            .entry(stream.to_string())
            .or_insert_with(|| StreamChannel::open(self.capacity));
        channel.tx.clone().ok_or_else(|| closed(stream))
    }

    pub async fn publish(&self, stream: &str, batch: DataUpdateBatch) -> GatewayResult<()> {
        self.publisher(stream)?.send(StreamEvent::Batch(batch)).await.map_err(|_| closed(stream))
    }

    pub async fn publish_error(&self, stream: &str, error: impl Into<String>) -> GatewayResult<()> {
        self.publisher(stream)?
            .send(StreamEvent::Error(error.into()))
            .await
            .map_err(|_| closed(stream))
    }

    /// Stop accepting events; the listener drains what was published and returns
    /// once every outstanding publisher is dropped.
    pub fn close(&self, stream: &str) {
        if let Some(mut channel) = self.channels.get_mut(stream) {
            channel.tx = None;
        }
    }

    fn take_receiver(&self, stream: &str) -> Option<mpsc::Receiver<StreamEvent>> {
        let mut channel = self
            .channels
            .entry(stream.to_string())
            .or_insert_with(|| StreamChannel::open(self.capacity));
        channel.rx.take()
    }
}

fn closed(stream: &str) -> GatewayError {
    GatewayError::Internal(format!("stream {} is closed", stream))
}

#[async_trait]
impl StreamClient for ChannelStreamClient {
    async fn stream(&self, listener: Arc<dyn StreamListener>) -> GatewayResult<()> {
        let name = listener.name().to_string();
        let Some(mut rx) = self.take_receiver(&name) else {
            return Err(GatewayError::InvalidRequest(format!(
                "stream {} already has a listener",
                name
            )));
        };

        tracing::debug!(stream = %name, "Listener subscribed");
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Batch(batch) => {
                    if !listener.update(batch).await {
                        tracing::info!(stream = %name, "Listener asked to stop streaming");
                        break;
                    }
                },
                StreamEvent::Error(error) => listener.report_error(&error),
            }
        }
        tracing::debug!(stream = %name, "Stream ended");
        Ok(())
    }
}
