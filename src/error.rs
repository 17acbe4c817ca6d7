use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run before any probing happens.
///
/// Per-attempt failures are never reported through this type; they are
/// recorded as an [`Outcome`](crate::probe::Outcome) instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not find a configuration directory")]
    NoConfigDir,

    #[error("failed to access settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode settings: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
