//! Schema subsystem
//!
//! Schemas describe entity kinds: field types plus the queryable, unique and
//! reference markers the constraint emulation relies on. Entities are
//! validated against their schema before any constraint lookup or write.

mod entity;
mod errors;
mod loader;
mod types;
mod validator;

pub use entity::{display_value, Entity};
pub use errors::{FieldErrors, SchemaError, SchemaErrorCode, SchemaResult};
pub use loader::{read_definition, DefinitionLoader, EntityDefinition};
pub use types::{FieldSpec, FieldType, Schema, CREATED_AT_FIELD, ID_FIELD};
pub use validator::{EntityValidator, SchemaValidator};
