//! DAO error taxonomy
//!
//! Every public DAO operation returns a success value or exactly one of
//! these. Rejections (validation, uniqueness, foreign key, not found) carry
//! enough detail to render per-field feedback; driver errors pass through
//! unmodified.

use thiserror::Error;

use crate::codec::EncodeError;
use crate::driver::DriverError;
use crate::schema::FieldErrors;
use crate::statement::StatementError;

/// DAO result type
pub type DaoResult<T> = Result<T, DaoError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DaoError {
    /// Draft or patch carried no fields
    #[error("entity has no fields")]
    NilEntity,

    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    #[error("uniqueness violated: {}", summarize(.0))]
    Uniqueness(FieldErrors),

    #[error("foreign key violated: {}", summarize(.0))]
    ForeignKey(FieldErrors),

    /// Target of an update or delete does not exist
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Startup only; the DAO was not built
    #[error("statement preparation failed: {0}")]
    StatementPrepare(StatementError),

    /// Definition or configuration rejected at startup
    #[error("invalid definition: {0}")]
    Definition(String),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

impl DaoError {
    /// Single-field validation error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), message.into());
        Self::Validation(errors)
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Stable error code for callers and logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::NilEntity => "DAO_NIL_ENTITY",
            Self::Validation(_) => "DAO_VALIDATION_FAILED",
            Self::Uniqueness(_) => "DAO_UNIQUE_VIOLATION",
            Self::ForeignKey(_) => "DAO_FOREIGN_KEY_VIOLATION",
            Self::NotFound(_) => "DAO_NOT_FOUND",
            Self::Encode(_) => "DAO_ENCODE_FAILED",
            Self::StatementPrepare(_) => "DAO_STATEMENT_PREPARE_FAILED",
            Self::Definition(_) => "DAO_INVALID_DEFINITION",
            Self::Driver(_) => "DAO_DRIVER_FAILED",
        }
    }

    /// Field-level messages, for the rejection kinds that carry them
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) | Self::Uniqueness(errors) | Self::ForeignKey(errors) => {
                Some(errors)
            }
            Self::Encode(_)
            | Self::NilEntity
            | Self::NotFound(_)
            | Self::StatementPrepare(_)
            | Self::Definition(_)
            | Self::Driver(_) => None,
        }
    }

    /// Startup failures; a DAO that hit one never serves requests
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StatementPrepare(_) | Self::Definition(_))
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}
