//! Forward bus events to NATS so other instances see committed decisions

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::BusError;
use crate::event::GuardianEvent;
use crate::subscriber::EventSubscriber;

pub const DEFAULT_SUBJECT_PREFIX: &str = "guardian.events";

/// Publishes each event as JSON on `<prefix>.<kind>`
pub struct NatsBridge {
    client: Client,
    prefix: String,
}

impl NatsBridge {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, BusError> {
        tracing::info!("Connecting to NATS at {}", url);

        let client = ConnectOptions::new()
            .name("guardian")
            .connection_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| BusError::SendFailed(format!("Failed to connect: {}", e)))?;

        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    pub fn subject_for(&self, event: &GuardianEvent) -> String {
        format!("{}.{}", self.prefix, event.kind())
    }
}

#[async_trait]
impl EventSubscriber for NatsBridge {
    fn name(&self) -> &str {
        "nats-bridge"
    }

    async fn handle(&self, event: &GuardianEvent) -> Result<(), BusError> {
        let payload = Bytes::from(serde_json::to_vec(event)?);
        self.client
            .publish(self.subject_for(event), payload)
            .await
            .map_err(|e| BusError::SendFailed(format!("Publish failed: {}", e)))
    }
}
