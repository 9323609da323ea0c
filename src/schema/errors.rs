//! Schema error types
//!
//! Error codes:
//! - DAO_SCHEMA_MALFORMED (schema or definition structure is invalid)
//! - DAO_SCHEMA_UNREADABLE (definition file could not be read or parsed)
//! - DAO_SCHEMA_DUPLICATE (two definitions declare the same entity kind)

use std::collections::BTreeMap;
use std::fmt;

/// Field-level error map: field name -> human-readable message.
///
/// Ordered so that rendered errors are deterministic.
pub type FieldErrors = BTreeMap<String, String>;

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Schema or definition structure is invalid
    Malformed,
    /// Definition file could not be read or parsed
    Unreadable,
    /// Entity kind declared twice
    Duplicate,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::Malformed => "DAO_SCHEMA_MALFORMED",
            SchemaErrorCode::Unreadable => "DAO_SCHEMA_UNREADABLE",
            SchemaErrorCode::Duplicate => "DAO_SCHEMA_DUPLICATE",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error with context
#[derive(Debug)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Source file or entity kind, when known
    origin: Option<String>,
}

impl SchemaError {
    /// Schema structure violates a rule
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            code: SchemaErrorCode::Malformed,
            message: format!("Malformed definition '{}': {}", origin, reason.into()),
            origin: Some(origin),
        }
    }

    /// Definition file could not be read or parsed
    pub fn unreadable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            code: SchemaErrorCode::Unreadable,
            message: format!("Cannot read definition '{}': {}", path, reason.into()),
            origin: Some(path),
        }
    }

    /// Entity kind already registered
    pub fn duplicate(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            code: SchemaErrorCode::Duplicate,
            message: format!("Entity kind '{}' is already defined", kind),
            origin: Some(kind),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source file or entity kind
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
