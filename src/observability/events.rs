//! Observable DAO events
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Every declared statement prepared; DAO accepts traffic
    DaoReady,
    /// DAO construction aborted
    DaoStartFailed,

    // Statements
    /// A template leaf or predicate statement was prepared
    StatementPrepared,
    /// The driver rejected a statement
    StatementPrepareFailed,
    /// A predicate statement was prepared on a cache miss
    DynamicStatementPrepared,

    // Requests
    EntityInserted,
    EntityUpdated,
    EntityDeleted,
    /// Entity failed schema validation
    ValidationRejected,
    /// A UNIQUE or FOREIGN KEY emulation check failed
    ConstraintViolated,
    /// Driver returned an error during a request
    DriverFailed,
}

impl Event {
    /// Returns the event name as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DaoReady => "DAO_READY",
            Event::DaoStartFailed => "DAO_START_FAILED",
            Event::StatementPrepared => "STATEMENT_PREPARED",
            Event::StatementPrepareFailed => "STATEMENT_PREPARE_FAILED",
            Event::DynamicStatementPrepared => "DYNAMIC_STATEMENT_PREPARED",
            Event::EntityInserted => "ENTITY_INSERTED",
            Event::EntityUpdated => "ENTITY_UPDATED",
            Event::EntityDeleted => "ENTITY_DELETED",
            Event::ValidationRejected => "VALIDATION_REJECTED",
            Event::ConstraintViolated => "CONSTRAINT_VIOLATED",
            Event::DriverFailed => "DRIVER_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::DaoStartFailed => Severity::Fatal,
            Event::StatementPrepareFailed | Event::DriverFailed => Severity::Error,
            Event::ValidationRejected | Event::ConstraintViolated => Severity::Warn,
            Event::DaoReady | Event::DynamicStatementPrepared => Severity::Info,
            Event::StatementPrepared
            | Event::EntityInserted
            | Event::EntityUpdated
            | Event::EntityDeleted => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
