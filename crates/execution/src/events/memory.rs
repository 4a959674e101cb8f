//! In-process event publisher.

use std::collections::HashMap;

use async_trait::async_trait;
use saga_domain::PublishError;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};

use super::EventPublisher;

/// Capacity of each channel's broadcast buffer. Slow subscribers that fall
/// further behind than this lose messages, consistent with best-effort
/// delivery.
const CHANNEL_CAPACITY: usize = 256;

/// Publisher fanning out over per-channel broadcast queues.
///
/// Subscribing is a concern of in-process consumers and tests, so it lives
/// on this concrete type rather than on the [`EventPublisher`] contract.
#[derive(Default)]
pub struct MemoryPublisher {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
}

impl MemoryPublisher {
    /// Creates a publisher with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `channel`, creating it if needed.
    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, channel: &str, message: &Value) -> Result<(), PublishError> {
        let channels = self.channels.lock().await;
        if let Some(sender) = channels.get(channel) {
            // A send with no live receivers just drops the message.
            let _ = sender.send(message.clone());
        }
        Ok(())
    }
}
