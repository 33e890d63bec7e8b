//! CLI error type

use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::LoadError;
use crate::config::ConfigError;
use crate::dn::DnError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read policy {path}: {source}")]
    Policy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy {path} {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("invalid requester DN: {0}")]
    InvalidDn(#[from] DnError),

    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code; `2` is reserved for rejected requests
    pub fn exit_code(&self) -> i32 {
        1
    }
}
