// Recurring job records fired by the broadcaster

use crate::errors::{TransportError, ValidationError};
use crate::models::Directive;
use crate::transport::Transport;
use chrono::{DateTime, Duration, Utc};

/// What a job does when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobAction {
    /// Publish a liveness ping on the transport's heartbeat topic
    Heartbeat { payload: String },
    /// Publish `{"msg": <directive>}` on `topic`
    Directive { topic: String, directive: Directive },
}

impl JobAction {
    /// Run the action against the transport
    pub async fn execute(&self, transport: &dyn Transport) -> Result<(), TransportError> {
        match self {
            JobAction::Heartbeat { payload } => transport.publish_heartbeat(payload).await,
            JobAction::Directive { topic, directive } => {
                let body = directive.payload().to_bytes()?;
                transport.publish(topic, body).await
            }
        }
    }

    /// Topic label for logs
    pub fn target(&self) -> &str {
        match self {
            JobAction::Heartbeat { .. } => "heartbeat",
            JobAction::Directive { topic, .. } => topic,
        }
    }
}

/// A recurring job with a fixed, strictly positive interval
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    interval: std::time::Duration,
    step: Duration,
    next_fire: DateTime<Utc>,
    last_fire: Option<DateTime<Utc>>,
    action: JobAction,
}

impl Job {
    /// Create a job whose first fire is one interval after `now`
    pub fn new(
        name: impl Into<String>,
        interval: std::time::Duration,
        action: JobAction,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();

        if interval.is_zero() {
            return Err(ValidationError::invalid(
                format!("{}.interval", name),
                "must be greater than 0",
            ));
        }

        let step = Duration::from_std(interval).map_err(|e| {
            ValidationError::invalid(format!("{}.interval", name), e.to_string())
        })?;

        let next_fire = now.checked_add_signed(step).ok_or_else(|| {
            ValidationError::invalid(format!("{}.interval", name), "out of range")
        })?;

        Ok(Self {
            name,
            interval,
            step,
            next_fire,
            last_fire: None,
            action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> std::time::Duration {
        self.interval
    }

    pub fn action(&self) -> &JobAction {
        &self.action
    }

    pub fn next_fire(&self) -> DateTime<Utc> {
        self.next_fire
    }

    pub fn last_fire(&self) -> Option<DateTime<Utc>> {
        self.last_fire
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_fire
    }

    /// Record a fire at `tick_time` and schedule the next one a full interval
    /// later. Missed periods are dropped, never replayed.
    pub fn mark_fired(&mut self, tick_time: DateTime<Utc>) {
        self.last_fire = Some(tick_time);
        self.next_fire = tick_time
            .checked_add_signed(self.step)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}
