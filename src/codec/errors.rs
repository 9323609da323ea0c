//! Codec errors

use thiserror::Error;

/// A field's value could not be converted to or from the store's wire type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot encode field '{field}': {reason}")]
pub struct EncodeError {
    /// The offending field
    pub field: String,
    pub reason: String,
}

impl EncodeError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, EncodeError>;
