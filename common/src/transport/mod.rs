// Transport capability used by the broadcaster

pub mod nats;

pub use nats::{NatsConfig, NatsTransport};

use crate::errors::TransportError;
use async_trait::async_trait;

/// Publish/subscribe capability the broadcaster depends on.
///
/// Publishing is fire-and-forget: a successful return means the message was
/// handed to the transport, not that any subscriber received it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection to the bus
    async fn connect(&self) -> Result<(), TransportError>;

    /// Publish a raw payload on a topic
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Publish the one-time registration announcement
    async fn publish_registration(&self, message: &str) -> Result<(), TransportError>;

    /// Publish a liveness ping
    async fn publish_heartbeat(&self, payload: &str) -> Result<(), TransportError>;

    /// Push out anything still buffered. Transports without buffering can rely on the default.
    async fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
