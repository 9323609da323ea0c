//! Driver errors
//!
//! Opaque passthrough from the database collaborator. The DAO never retries
//! or reinterprets these.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Statement text rejected at prepare time
    #[error("syntax error in '{query}': {reason}")]
    Syntax { query: String, reason: String },

    /// Handle does not name a statement this driver prepared
    #[error("unknown statement handle {0}")]
    UnknownStatement(u64),

    /// Bound values or options rejected at execution time
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Store unreachable or overloaded
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Execution failed in the store
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;
