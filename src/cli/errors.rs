//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::io;

use thiserror::Error;

use crate::dao::DaoError;
use crate::schema::SchemaError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Definition or config could not be loaded
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// DAO construction failed
    BuildFailed,
    /// Predicate rejected by the schema
    Rejected,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DAO_CLI_CONFIG_ERROR",
            Self::IoError => "DAO_CLI_IO_ERROR",
            Self::BuildFailed => "DAO_CLI_BUILD_FAILED",
            Self::Rejected => "DAO_CLI_REJECTED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", .code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn build_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BuildFailed, msg)
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Rejected, msg)
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<DaoError> for CliError {
    fn from(e: DaoError) -> Self {
        if e.field_errors().is_some() {
            Self::rejected(e.to_string())
        } else {
            Self::build_failed(e.to_string())
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("missing file");
        assert_eq!(err.to_string(), "DAO_CLI_CONFIG_ERROR: missing file");
    }

    #[test]
    fn test_dao_rejection_maps_to_rejected() {
        let err: CliError = DaoError::invalid_field("bio", "bio is not queryable").into();
        assert_eq!(err.code(), CliErrorCode::Rejected);

        let err: CliError = DaoError::Definition("bad".into()).into();
        assert_eq!(err.code(), CliErrorCode::BuildFailed);
    }
}
