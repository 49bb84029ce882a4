// Wire payloads broadcast by the C2 node

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directive tags understood by file-saving nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    /// Close the current output file and start a new one
    #[serde(rename = "NEW FILE")]
    NewFile,
    /// Push written files up to remote storage
    #[serde(rename = "S3 SYNC")]
    S3Sync,
}

impl Directive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::NewFile => "NEW FILE",
            Directive::S3Sync => "S3 SYNC",
        }
    }

    /// Build the JSON payload for this directive
    pub fn payload(self) -> DirectivePayload {
        DirectivePayload { msg: self }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body published on the directive topic: `{"msg": "<tag>"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectivePayload {
    pub msg: Directive,
}

impl DirectivePayload {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

pub const DEFAULT_HEARTBEAT_PAYLOAD: &str = "C2 Heartbeat";
pub const DEFAULT_REGISTRATION_PAYLOAD: &str = "C2 Registration";
