// Configuration management with layered configuration (defaults, file, env)

use crate::errors::ValidationError;
use crate::models::{DEFAULT_HEARTBEAT_PAYLOAD, DEFAULT_REGISTRATION_PAYLOAD};
use crate::scheduler::BroadcasterConfig;
use crate::transport::NatsConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Flat environment variables understood for compatibility with existing
/// deployments, and the setting each one overrides.
pub const LEGACY_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("C2_TOPIC", "c2.topic"),
    ("NATS_URL", "nats.url"),
    ("DEBUG", "c2.debug"),
    ("FILE_INTERVAL", "c2.file_interval_minutes"),
    ("S3_INTERVAL", "c2.s3_interval_minutes"),
];

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub nats: NatsSettings,
    pub c2: C2Settings,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsSettings {
    pub url: String,
    pub client_name: String,
    pub connection_timeout_seconds: u64,
    pub registration_subject: String,
    pub heartbeat_subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct C2Settings {
    /// Topic directives are broadcast on
    pub topic: String,
    pub file_interval_minutes: u64,
    pub s3_interval_minutes: u64,
    pub heartbeat_interval_seconds: u64,
    pub heartbeat_payload: String,
    pub registration_payload: String,
    pub registration_grace_ms: u64,
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: Option<u16>,
    pub tracing_endpoint: Option<String>,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        Self::load_with(config_dir, |key| std::env::var(key).ok())
    }

    /// Load configuration, resolving legacy flat variables through `lookup`
    pub fn load_with<P, F>(config_dir: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with built-in defaults
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, lookup(var))?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nats.url.is_empty() {
            return Err(ValidationError::invalid("nats.url", "must not be empty"));
        }
        if self.nats.registration_subject.is_empty() {
            return Err(ValidationError::invalid(
                "nats.registration_subject",
                "must not be empty",
            ));
        }
        if self.nats.heartbeat_subject.is_empty() {
            return Err(ValidationError::invalid(
                "nats.heartbeat_subject",
                "must not be empty",
            ));
        }

        if self.c2.topic.trim().is_empty() {
            return Err(ValidationError::MissingField("c2.topic".to_string()));
        }

        let positive = [
            ("c2.file_interval_minutes", self.c2.file_interval_minutes),
            ("c2.s3_interval_minutes", self.c2.s3_interval_minutes),
            (
                "c2.heartbeat_interval_seconds",
                self.c2.heartbeat_interval_seconds,
            ),
            ("c2.tick_interval_ms", self.c2.tick_interval_ms),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ValidationError::invalid(field, "must be greater than 0"));
            }
        }

        self.broadcaster_config().validate()
    }

    /// Log filter to use when `RUST_LOG` is not set
    pub fn effective_log_level(&self) -> &str {
        if self.c2.debug {
            "debug"
        } else {
            &self.observability.log_level
        }
    }

    pub fn nats_config(&self) -> NatsConfig {
        NatsConfig {
            url: self.nats.url.clone(),
            client_name: self.nats.client_name.clone(),
            connection_timeout_seconds: self.nats.connection_timeout_seconds,
            registration_subject: self.nats.registration_subject.clone(),
            heartbeat_subject: self.nats.heartbeat_subject.clone(),
        }
    }

    pub fn broadcaster_config(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            topic: self.c2.topic.clone(),
            file_interval: minutes(self.c2.file_interval_minutes),
            s3_interval: minutes(self.c2.s3_interval_minutes),
            heartbeat_interval: Duration::from_secs(self.c2.heartbeat_interval_seconds),
            heartbeat_payload: self.c2.heartbeat_payload.clone(),
            registration_payload: self.c2.registration_payload.clone(),
            registration_grace: Duration::from_millis(self.c2.registration_grace_ms),
            tick_interval: Duration::from_millis(self.c2.tick_interval_ms),
        }
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

impl Default for Settings {
    fn default() -> Self {
        let nats = NatsConfig::default();
        Self {
            nats: NatsSettings {
                url: nats.url,
                client_name: nats.client_name,
                connection_timeout_seconds: nats.connection_timeout_seconds,
                registration_subject: nats.registration_subject,
                heartbeat_subject: nats.heartbeat_subject,
            },
            c2: C2Settings {
                topic: String::new(),
                file_interval_minutes: 10,
                s3_interval_minutes: 15,
                heartbeat_interval_seconds: 10,
                heartbeat_payload: DEFAULT_HEARTBEAT_PAYLOAD.to_string(),
                registration_payload: DEFAULT_REGISTRATION_PAYLOAD.to_string(),
                registration_grace_ms: 1000,
                tick_interval_ms: 100,
                debug: false,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: None,
                tracing_endpoint: None,
            },
        }
    }
}
