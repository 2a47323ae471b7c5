//! CLI-specific error types and mappings.
//!
//! Library errors are mapped to exit codes here; everything else travels as
//! `anyhow::Error` up to `main`.

use podfetch_core::settings::SettingsError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument or input file could not be interpreted.
    #[error("Invalid input: {0}")]
    Input(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Codes follow sysexits.h.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 65, // EX_DATAERR
            Self::Io(_) => 74,    // EX_IOERR
            Self::Config(_) => 78, // EX_CONFIG
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Io { .. } => Self::Io(err.to_string()),
            other => Self::Config(other.to_string()),
        }
    }
}
