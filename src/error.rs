//! Error types
//!
//! Both kinds are fatal for the operation that raised them: a bad option set
//! stops the engine from being built, and a rejected snapshot leaves the
//! running engine untouched.

use thiserror::Error;

use crate::settings::DistributionMode;

/// Invalid or incompatible configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("distribution mode `{mode}` is not supported by {env}")]
    UnsupportedMode {
        env: &'static str,
        mode: DistributionMode,
    },

    #[error("options must be a JSON object")]
    NotAnObject,

    #[error("failed to parse options: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Snapshot encode/restore failure
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot format version {found} does not match {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("snapshot belongs to environment `{found}`, expected `{expected}`")]
    EnvMismatch { expected: String, found: String },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("{0} unexpected trailing bytes after snapshot body")]
    TrailingBytes(usize),

    #[error("snapshot carries invalid settings: {0}")]
    Config(#[from] ConfigError),
}
