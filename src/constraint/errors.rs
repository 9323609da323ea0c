//! Constraint check errors
//!
//! A check that could not run is an error; a check that ran and found a
//! violation is not. Callers must be able to tell the two apart.

use thiserror::Error;

use crate::codec::EncodeError;
use crate::driver::DriverError;

/// Result type for constraint checks
pub type ConstraintResult<T> = Result<T, ConstraintError>;

/// A constraint lookup could not be completed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("constraint lookup failed: {0}")]
    Driver(#[from] DriverError),

    #[error("constraint lookup could not bind its values: {0}")]
    Encode(#[from] EncodeError),
}
