//! Statement subsystem
//!
//! Template trees declared per entity kind are compiled into prepared
//! statements once at startup. Predicate statements built at request time are
//! prepared lazily and memoized by their resolved text.

mod cache;
mod compiler;
mod errors;
mod template;

pub use cache::{CacheOutcome, StatementCache};
pub use compiler::{PreparedStatement, StatementCompiler, StatementNode};
pub use errors::{StatementError, StatementResult};
pub use template::{
    join_path, StatementTemplate, TemplateNode, CORE_STATEMENTS, DELETE, EXISTS_GROUP, INSERT,
    PREDICATE_SLOT, SELECT, SELECT_ONE, UNIQUE_GROUP, UPDATE,
};
