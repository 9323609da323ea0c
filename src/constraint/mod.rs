//! Emulated UNIQUE and FOREIGN KEY constraints
//!
//! Every check is a synchronous lookup run before the mutating statement.
//! Two callers writing the same unique value concurrently can both pass their
//! checks before either writes; the store offers no conditional write to close
//! that window.

mod enforcer;
mod errors;

pub use enforcer::{ConstraintEnforcer, ConstraintReport};
pub use errors::{ConstraintError, ConstraintResult};
