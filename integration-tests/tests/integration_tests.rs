// Integration tests for the C2 broadcaster over NATS
// Tests marked #[ignore] need a NATS server (NATS_URL, default nats://localhost:4222)

use common::errors::{BroadcastError, TransportError};
use common::scheduler::{Broadcaster, BroadcasterConfig, SystemClock};
use common::transport::{NatsConfig, NatsTransport, Transport};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn nats_url() -> String {
    std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

/// Helper to build a transport with per-test subjects
fn test_transport(url: String, prefix: &str) -> Arc<NatsTransport> {
    Arc::new(NatsTransport::new(NatsConfig {
        url,
        client_name: format!("c2-{}", prefix),
        connection_timeout_seconds: 2,
        registration_subject: format!("{}.registration", prefix),
        heartbeat_subject: format!("{}.heartbeat", prefix),
    }))
}

fn fast_config(topic: &str) -> BroadcasterConfig {
    let mut config = BroadcasterConfig::new(topic)
        .with_intervals(Duration::from_secs(1), Duration::from_secs(2));
    config.heartbeat_interval = Duration::from_secs(1);
    config.registration_grace = Duration::from_millis(100);
    config.tick_interval = Duration::from_millis(10);
    config
}

#[tokio::test]
async fn test_unreachable_server_is_connection_error() {
    // Nothing listens on port 1.
    let transport = test_transport("nats://127.0.0.1:1".to_string(), "unreachable");

    let result = Broadcaster::connect(
        fast_config("unreachable.c2"),
        transport.clone(),
        Arc::new(SystemClock::new()),
    )
    .await;

    assert!(matches!(
        result,
        Err(BroadcastError::Connection(TransportError::Connection(_)))
    ));
    assert!(!transport.is_connected());
}

#[tokio::test]
#[ignore] // Requires NATS to be running
async fn test_registration_is_announced_on_connect() {
    let observer = async_nats::connect(nats_url())
        .await
        .expect("Failed to connect observer to NATS");
    let mut registrations = observer
        .subscribe("it-registration.registration")
        .await
        .expect("Failed to subscribe");
    observer.flush().await.expect("Failed to flush observer");

    let transport = test_transport(nats_url(), "it-registration");
    let _broadcaster = Broadcaster::connect(
        fast_config("it-registration.c2"),
        transport.clone(),
        Arc::new(SystemClock::new()),
    )
    .await
    .expect("Failed to connect broadcaster");
    transport.flush().await.expect("Failed to flush transport");

    let message = timeout(Duration::from_secs(5), registrations.next())
        .await
        .expect("Timed out waiting for registration")
        .expect("Subscription closed");
    assert_eq!(message.payload.as_ref(), b"C2 Registration");
}

#[tokio::test]
#[ignore] // Requires NATS to be running
async fn test_directives_and_heartbeat_are_broadcast() {
    let observer = async_nats::connect(nats_url())
        .await
        .expect("Failed to connect observer to NATS");
    let mut directives = observer
        .subscribe("it-directives.c2")
        .await
        .expect("Failed to subscribe to directives");
    let mut heartbeats = observer
        .subscribe("it-directives.heartbeat")
        .await
        .expect("Failed to subscribe to heartbeats");
    observer.flush().await.expect("Failed to flush observer");

    let transport = test_transport(nats_url(), "it-directives");
    let mut broadcaster = Broadcaster::connect(
        fast_config("it-directives.c2"),
        transport.clone(),
        Arc::new(SystemClock::new()),
    )
    .await
    .expect("Failed to connect broadcaster");
    let shutdown = broadcaster.shutdown_handle();
    let task = tokio::spawn(async move { broadcaster.run().await });

    let heartbeat = timeout(Duration::from_secs(5), heartbeats.next())
        .await
        .expect("Timed out waiting for heartbeat")
        .expect("Subscription closed");
    assert_eq!(heartbeat.payload.as_ref(), b"C2 Heartbeat");

    let mut seen = Vec::new();
    while !seen.iter().any(|m: &serde_json::Value| m["msg"] == "S3 SYNC") {
        let message = timeout(Duration::from_secs(5), directives.next())
            .await
            .expect("Timed out waiting for directive")
            .expect("Subscription closed");
        seen.push(serde_json::from_slice(&message.payload).expect("Directive is not JSON"));
    }
    assert!(seen.iter().any(|m| m["msg"] == "NEW FILE"));

    shutdown.shutdown();
    let result = timeout(Duration::from_secs(5), task)
        .await
        .expect("Broadcaster did not stop")
        .expect("Broadcaster task panicked");
    assert!(result.is_ok());
    transport.flush().await.expect("Failed to flush transport");
}
