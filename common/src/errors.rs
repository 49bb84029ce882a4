// Error handling framework

use thiserror::Error;

/// Transport-related errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to transport: {0}")]
    Connection(String),

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Failed to publish message on '{topic}': {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Message serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Failed to flush transport: {0}")]
    Flush(String),
}

impl TransportError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connection(_) => "connection",
            TransportError::NotConnected => "not_connected",
            TransportError::PublishFailed { .. } => "publish_failed",
            TransportError::SerializationFailed(_) => "serialization_failed",
            TransportError::Flush(_) => "flush",
        }
    }
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFieldValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Broadcaster construction and run errors
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("Invalid broadcaster configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    Connection(TransportError),

    #[error("Transport error: {0}")]
    Transport(TransportError),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::SerializationFailed(err.to_string())
    }
}
