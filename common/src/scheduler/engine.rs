// Broadcaster engine: fixed job table driven by a periodic ticker

use crate::errors::{BroadcastError, ValidationError};
use crate::models::{Directive, DEFAULT_HEARTBEAT_PAYLOAD, DEFAULT_REGISTRATION_PAYLOAD};
use crate::scheduler::clock::Clock;
use crate::scheduler::job::{Job, JobAction};
use crate::telemetry;
use crate::transport::Transport;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

pub const HEARTBEAT_JOB: &str = "heartbeat";
pub const FILE_ROTATION_JOB: &str = "file_rotation";
pub const REMOTE_SYNC_JOB: &str = "remote_sync";

/// Configuration for the broadcaster
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Topic directives are published on
    pub topic: String,
    /// How often to broadcast `NEW FILE`
    pub file_interval: Duration,
    /// How often to broadcast `S3 SYNC`
    pub s3_interval: Duration,
    /// How often to publish a heartbeat
    pub heartbeat_interval: Duration,
    pub heartbeat_payload: String,
    pub registration_payload: String,
    /// Pause between connecting and the registration announcement
    pub registration_grace: Duration,
    /// How often the job table is checked
    pub tick_interval: Duration,
}

impl BroadcasterConfig {
    pub const DEFAULT_FILE_INTERVAL: Duration = Duration::from_secs(10 * 60);
    pub const DEFAULT_S3_INTERVAL: Duration = Duration::from_secs(15 * 60);
    pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
    /// Longest accepted interval (one year)
    pub const MAX_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

    /// Config with the reference deployment's defaults for everything but the topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            file_interval: Self::DEFAULT_FILE_INTERVAL,
            s3_interval: Self::DEFAULT_S3_INTERVAL,
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_payload: DEFAULT_HEARTBEAT_PAYLOAD.to_string(),
            registration_payload: DEFAULT_REGISTRATION_PAYLOAD.to_string(),
            registration_grace: Duration::from_secs(1),
            tick_interval: Duration::from_millis(100),
        }
    }

    pub fn with_intervals(mut self, file_interval: Duration, s3_interval: Duration) -> Self {
        self.file_interval = file_interval;
        self.s3_interval = s3_interval;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::invalid("topic", "must not be empty"));
        }

        let intervals = [
            ("file_interval", self.file_interval),
            ("s3_interval", self.s3_interval),
            ("heartbeat_interval", self.heartbeat_interval),
            ("tick_interval", self.tick_interval),
        ];
        for (field, value) in intervals {
            if value.is_zero() {
                return Err(ValidationError::invalid(field, "must be greater than 0"));
            }
            if value > Self::MAX_INTERVAL {
                return Err(ValidationError::invalid(
                    field,
                    format!("must not exceed {} seconds", Self::MAX_INTERVAL.as_secs()),
                ));
            }
        }

        Ok(())
    }
}

/// Cloneable handle that stops a running broadcaster at its next tick boundary
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// C2 broadcaster: publishes the heartbeat and the recurring directives
pub struct Broadcaster {
    config: BroadcasterConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    jobs: Vec<Job>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Broadcaster {
    /// Connect the transport and announce this node.
    ///
    /// Fails with [`BroadcastError::Validation`] before touching the transport
    /// if the config is invalid, and with [`BroadcastError::Connection`] if the
    /// transport cannot connect. In both cases no registration is sent.
    #[instrument(skip_all, fields(topic = %config.topic))]
    pub async fn connect(
        config: BroadcasterConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BroadcastError> {
        config.validate()?;

        transport.connect().await.map_err(|e| {
            error!(error = %e, "Transport connection failed");
            BroadcastError::Connection(e)
        })?;

        // Let the connection settle before the first publish.
        sleep(config.registration_grace).await;

        match transport
            .publish_registration(&config.registration_payload)
            .await
        {
            Ok(()) => info!("Registration published"),
            Err(e) => warn!(error = %e, "Failed to publish registration"),
        }

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            transport,
            clock,
            jobs: Vec::new(),
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Build the job table. Registration order is firing order within a tick.
    /// Calling this again once jobs exist is a no-op.
    pub fn register_jobs(&mut self) -> Result<(), BroadcastError> {
        if !self.jobs.is_empty() {
            return Ok(());
        }

        let now = self.clock.now();
        let topic = &self.config.topic;

        self.jobs = vec![
            Job::new(
                HEARTBEAT_JOB,
                self.config.heartbeat_interval,
                JobAction::Heartbeat {
                    payload: self.config.heartbeat_payload.clone(),
                },
                now,
            )?,
            Job::new(
                FILE_ROTATION_JOB,
                self.config.file_interval,
                JobAction::Directive {
                    topic: topic.clone(),
                    directive: Directive::NewFile,
                },
                now,
            )?,
            Job::new(
                REMOTE_SYNC_JOB,
                self.config.s3_interval,
                JobAction::Directive {
                    topic: topic.clone(),
                    directive: Directive::S3Sync,
                },
                now,
            )?,
        ];

        telemetry::set_jobs_registered(self.jobs.len());
        for job in &self.jobs {
            info!(
                job = job.name(),
                interval_seconds = job.interval().as_secs_f64(),
                next_fire = %job.next_fire(),
                "Job registered"
            );
        }

        Ok(())
    }

    /// Register the jobs and check them every tick until shut down.
    ///
    /// Shutdown is only observed between ticks, so a job's publish either
    /// completes or never starts.
    #[instrument(skip(self), fields(topic = %self.config.topic))]
    pub async fn run(&mut self) -> Result<(), BroadcastError> {
        self.register_jobs()?;

        info!(
            tick_interval_ms = self.config.tick_interval.as_millis() as u64,
            "Starting broadcaster"
        );

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            if *shutdown_rx.borrow_and_update() {
                info!("Shutdown signal received, stopping broadcaster");
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let fired = self.run_pending().await;
                    if fired > 0 {
                        debug!(jobs_fired = fired, "Tick complete");
                    }
                }
            }
        }

        info!("Broadcaster stopped");
        Ok(())
    }

    /// Fire every job that is due at the current clock reading.
    ///
    /// The clock is read once per tick and each fired job is rescheduled one
    /// interval after that reading. Failures are logged and never stop the
    /// remaining jobs. Returns the number of jobs fired.
    pub async fn run_pending(&mut self) -> usize {
        let started = Instant::now();
        let tick_time = self.clock.now();
        let transport = self.transport.as_ref();
        let mut fired = 0;

        for job in self.jobs.iter_mut() {
            if !job.is_due(tick_time) {
                continue;
            }

            let outcome = AssertUnwindSafe(job.action().execute(transport))
                .catch_unwind()
                .await;
            job.mark_fired(tick_time);
            fired += 1;

            match outcome {
                Ok(Ok(())) => {
                    debug!(
                        job = job.name(),
                        target = job.action().target(),
                        next_fire = %job.next_fire(),
                        "Job fired"
                    );
                    telemetry::record_publish(job.name());
                }
                Ok(Err(e)) => {
                    error!(
                        job = job.name(),
                        target = job.action().target(),
                        error = %e,
                        "Failed to publish"
                    );
                    telemetry::record_publish_failure(job.name(), e.kind());
                }
                Err(_) => {
                    error!(job = job.name(), "Job panicked while firing");
                    telemetry::record_publish_failure(job.name(), "panic");
                }
            }
        }

        telemetry::record_tick_duration(started.elapsed().as_secs_f64());
        fired
    }
}
