//! Statement compilation errors

use thiserror::Error;

use crate::driver::DriverError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// The driver rejected a statement. Fatal during startup.
    #[error("failed to prepare statement '{path}' ({query}): {source}")]
    Prepare {
        /// Dotted template path, or `<dynamic>`
        path: String,
        query: String,
        #[source]
        source: DriverError,
    },

    /// A required template is absent or is a group
    #[error("statement '{0}' is not declared")]
    Missing(String),

    /// Predicate names fields that may not be queried
    #[error("fields are not queryable: {}", .0.join(", "))]
    NotQueryable(Vec<String>),

    /// Statement cache lock poisoned by a panicking thread
    #[error("statement cache unavailable")]
    CachePoisoned,
}

/// Result type for statement operations
pub type StatementResult<T> = Result<T, StatementError>;
