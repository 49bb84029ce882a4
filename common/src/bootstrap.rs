// Bootstrap utilities for binary initialization

use crate::config::Settings;
use crate::scheduler::{Broadcaster, SystemClock};
use crate::telemetry;
use crate::transport::{NatsTransport, Transport};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Initialize logging and, when configured, the metrics exporter
pub fn init_observability(settings: &Settings) -> Result<()> {
    telemetry::init_logging(
        settings.effective_log_level(),
        settings.observability.tracing_endpoint.as_deref(),
    )?;

    if let Some(port) = settings.observability.metrics_port {
        telemetry::init_metrics(port)?;
    }

    Ok(())
}

/// Build the NATS transport. The connection is opened by the broadcaster.
pub fn init_nats_transport(settings: &Settings) -> Arc<NatsTransport> {
    let config = settings.nats_config();
    info!(url = %config.url, client_name = %config.client_name, "NATS transport configured");
    Arc::new(NatsTransport::new(config))
}

/// Connect the transport and construct the broadcaster on the wall clock
///
/// # Errors
/// Returns error if the configuration is invalid or the transport cannot connect
#[tracing::instrument(skip_all)]
pub async fn init_broadcaster(
    settings: &Settings,
    transport: Arc<dyn Transport>,
) -> Result<Broadcaster> {
    let broadcaster =
        Broadcaster::connect(settings.broadcaster_config(), transport, Arc::new(SystemClock::new()))
            .await
            .context("Failed to start broadcaster")?;

    info!(topic = %settings.c2.topic, "Broadcaster connected");
    Ok(broadcaster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nats_transport_uses_settings() {
        let mut settings = Settings::default();
        settings.nats.url = "nats://broker:4222".to_string();
        settings.nats.heartbeat_subject = "edge.heartbeat".to_string();

        let transport = init_nats_transport(&settings);

        assert_eq!(transport.config().url, "nats://broker:4222");
        assert_eq!(transport.config().heartbeat_subject, "edge.heartbeat");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_init_broadcaster_rejects_missing_topic() {
        let settings = Settings::default();
        let transport = init_nats_transport(&settings);

        let result = init_broadcaster(&settings, transport.clone()).await;

        assert!(result.is_err());
        assert!(!transport.is_connected());
    }
}
