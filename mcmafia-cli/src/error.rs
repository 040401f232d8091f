//! CLI error type and exit code mapping

use crate::config::ConfigError;
use mcmafia::{ErrorSeverity, ServiceError, Severity};
use thiserror::Error;

/// Exit code for a rejected operation
pub const ERROR_EXIT_CODE: i32 = 1;

/// Exit code for broken input data or an unusable store
pub const CRITICAL_EXIT_CODE: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

impl Severity for CliError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            CliError::Config(_) => ErrorSeverity::Error,
            CliError::Service(err) => err.severity(),
            CliError::Io(_) | CliError::Json(_) => ErrorSeverity::Critical,
        }
    }
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Critical => CRITICAL_EXIT_CODE,
            ErrorSeverity::Error | ErrorSeverity::Warning => ERROR_EXIT_CODE,
        }
    }
}
