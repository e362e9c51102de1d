//! Guardian Event Bus - In-process async event distribution
//!
//! Distributes committed pipeline events (decisions, alerts, agent status
//! changes) to subscribers.
//!
//! - Async pub/sub with tokio broadcast channel
//! - EventSubscriber trait for custom handlers
//! - Optional NATS bridge (`nats` feature) for multi-instance deployments
//! - No retention in bus - the store is the source of truth

pub mod channel;
pub mod error;
pub mod event;
#[cfg(feature = "nats")]
pub mod nats;
pub mod subscriber;

pub use channel::{EventBus, EventPublisher, DEFAULT_CAPACITY};
pub use error::BusError;
pub use event::GuardianEvent;
#[cfg(feature = "nats")]
pub use nats::NatsBridge;
pub use subscriber::{spawn_subscriber, EventSubscriber};
