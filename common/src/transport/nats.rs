// NATS transport implementation

use crate::errors::TransportError;
use crate::transport::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// NATS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL (e.g., "nats://localhost:4222")
    pub url: String,
    /// Client name reported to the server
    pub client_name: String,
    /// Timeout for the initial connection attempt
    pub connection_timeout_seconds: u64,
    /// Subject for the one-time registration announcement
    pub registration_subject: String,
    /// Subject for liveness pings
    pub heartbeat_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            client_name: "c2".to_string(),
            connection_timeout_seconds: 5,
            registration_subject: "registration".to_string(),
            heartbeat_subject: "heartbeat".to_string(),
        }
    }
}

/// Core NATS transport. Publishes are buffered by the client and never wait
/// for an acknowledgment.
pub struct NatsTransport {
    client: OnceCell<async_nats::Client>,
    config: NatsConfig,
}

impl NatsTransport {
    /// Create an unconnected transport
    pub fn new(config: NatsConfig) -> Self {
        Self {
            client: OnceCell::new(),
            config,
        }
    }

    /// Create a transport from an already connected client
    pub fn from_client(client: async_nats::Client, config: NatsConfig) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Whether `connect` has completed
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    fn client(&self) -> Result<&async_nats::Client, TransportError> {
        self.client.get().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for NatsTransport {
    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn connect(&self) -> Result<(), TransportError> {
        self.client
            .get_or_try_init(|| async {
                info!("Connecting to NATS server");

                let client = async_nats::ConnectOptions::new()
                    .name(&self.config.client_name)
                    .connection_timeout(Duration::from_secs(
                        self.config.connection_timeout_seconds,
                    ))
                    .connect(self.config.url.as_str())
                    .await
                    .map_err(|e| {
                        TransportError::Connection(format!("Failed to connect to NATS: {}", e))
                    })?;

                info!("Connected to NATS server successfully");
                Ok::<_, TransportError>(client)
            })
            .await?;

        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let client = self.client()?;

        client
            .publish(topic.to_string(), payload.into())
            .await
            .map_err(|e| TransportError::PublishFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        debug!(topic = %topic, "Message handed to NATS client");
        Ok(())
    }

    async fn publish_registration(&self, message: &str) -> Result<(), TransportError> {
        self.publish(
            &self.config.registration_subject,
            message.as_bytes().to_vec(),
        )
        .await
    }

    async fn publish_heartbeat(&self, payload: &str) -> Result<(), TransportError> {
        self.publish(&self.config.heartbeat_subject, payload.as_bytes().to_vec())
            .await
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> Result<(), TransportError> {
        // Nothing was ever published if we never connected.
        let Some(client) = self.client.get() else {
            return Ok(());
        };

        client
            .flush()
            .await
            .map_err(|e| TransportError::Flush(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nats_config_default() {
        let config = NatsConfig::default();
        assert_eq!(config.url, "nats://localhost:4222");
        assert_eq!(config.client_name, "c2");
        assert_eq!(config.connection_timeout_seconds, 5);
        assert_eq!(config.registration_subject, "registration");
        assert_eq!(config.heartbeat_subject, "heartbeat");
    }

    #[tokio::test]
    async fn test_publish_before_connect_fails() {
        let transport = NatsTransport::new(NatsConfig::default());
        assert!(!transport.is_connected());

        let result = transport.publish("c2", b"{}".to_vec()).await;
        assert!(matches!(result, Err(TransportError::NotConnected)));

        let result = transport.publish_heartbeat("C2 Heartbeat").await;
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_flush_before_connect_is_noop() {
        let transport = NatsTransport::new(NatsConfig::default());
        assert!(transport.flush().await.is_ok());
    }
}
