//! Event subscriber trait for async event handling

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::error::BusError;
use crate::event::GuardianEvent;

/// Trait for event subscribers
///
/// Each subscriber should be idempotent (handle duplicate events gracefully).
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Get the subscriber name (for logging)
    fn name(&self) -> &str;

    /// Handle a pipeline event
    async fn handle(&self, event: &GuardianEvent) -> Result<(), BusError>;
}

/// Drive a subscriber from a receiver until the bus is dropped.
///
/// Handler failures are logged and do not stop the loop. A lagging
/// subscriber skips the events it missed.
pub fn spawn_subscriber(
    mut receiver: broadcast::Receiver<GuardianEvent>,
    subscriber: Arc<dyn EventSubscriber>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = subscriber.handle(&event).await {
                        tracing::warn!(
                            subscriber = subscriber.name(),
                            kind = event.kind(),
                            error = %e,
                            "Subscriber failed"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = subscriber.name(), skipped, "Subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{EventBus, EventPublisher};
    use std::sync::Mutex;

    struct Collector {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventSubscriber for Collector {
        fn name(&self) -> &str {
            "collector"
        }

        async fn handle(&self, event: &GuardianEvent) -> Result<(), BusError> {
            self.seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.kind().to_string());
            if event.kind() == "evaluation_yielded" {
                return Err(BusError::SendFailed("boom".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_subscriber_survives_handler_errors() -> anyhow::Result<()> {
        let bus = EventBus::new(8);
        let collector = Arc::new(Collector {
            seen: Mutex::new(Vec::new()),
        });
        let handle = spawn_subscriber(bus.subscribe(), collector.clone());

        bus.publish(GuardianEvent::evaluation_yielded("TX-1"));
        bus.publish(GuardianEvent::alert_resolved("ALRT-1", guardian_core::ReviewDecision::Approve));
        drop(bus);

        handle.await?;
        let seen = collector.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["evaluation_yielded", "alert_resolved"]);
        Ok(())
    }
}
