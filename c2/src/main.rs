// C2 broadcaster binary entry point

use anyhow::Result;
use common::bootstrap;
use common::config::Settings;
use common::telemetry;
use common::transport::Transport;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    bootstrap::init_observability(&settings)?;

    info!("Starting C2 broadcaster");

    settings.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    info!(
        nats_url = %settings.nats.url,
        topic = %settings.c2.topic,
        file_interval_minutes = settings.c2.file_interval_minutes,
        s3_interval_minutes = settings.c2.s3_interval_minutes,
        "Configuration loaded"
    );

    let transport = bootstrap::init_nats_transport(&settings);
    let mut broadcaster = bootstrap::init_broadcaster(&settings, transport.clone())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to initialize broadcaster");
            e
        })?;

    // Stop at the next tick boundary on SIGINT/SIGTERM
    let shutdown = broadcaster.shutdown_handle();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, stopping broadcaster");
        shutdown.shutdown();
    });

    if let Err(e) = broadcaster.run().await {
        error!(error = %e, "Broadcaster error");
        return Err(e.into());
    }

    if let Err(e) = transport.flush().await {
        warn!(error = %e, "Failed to flush transport on shutdown");
    }
    telemetry::shutdown_tracer();

    info!("C2 broadcaster stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await
}

/// Resolves on Ctrl+C. If the listener cannot be installed this never
/// resolves, so the broadcaster keeps running.
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
