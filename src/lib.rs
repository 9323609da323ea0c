//! columndao - a generic DAO over a schemaless column store
//!
//! Emulates UNIQUE and FOREIGN KEY constraints with read-before-write
//! lookups, validates entities against declared schemas, and compiles every
//! statement once at startup.

pub mod cli;
pub mod codec;
pub mod constraint;
pub mod dao;
pub mod driver;
pub mod observability;
pub mod schema;
pub mod statement;

pub use codec::{EncodeError, ValueEncoder, WireValue};
pub use constraint::{ConstraintEnforcer, ConstraintReport};
pub use dao::{
    DaoConfig, DaoError, DaoResult, EntityDao, IdGenerator, Page, RandomUuidGenerator,
    TimeUuidGenerator,
};
pub use driver::{Driver, DriverError, ExecResult, ExecuteOptions, MemoryDriver, PagingState};
pub use schema::{Entity, EntityDefinition, EntityValidator, FieldSpec, FieldType, Schema};
pub use statement::{PreparedStatement, StatementCompiler, StatementTemplate, TemplateNode};
