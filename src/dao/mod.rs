//! Entity DAO
//!
//! Schema-validated CRUD over a store without native UNIQUE, FOREIGN KEY, or
//! ad hoc predicates. One DAO serves one entity kind and is safe to share
//! across threads.

mod config;
mod entity_dao;
mod errors;
mod identity;

pub use config::DaoConfig;
pub use entity_dao::{EntityDao, EntityDaoBuilder, Page};
pub use errors::{DaoError, DaoResult};
pub use identity::{IdGenerator, RandomUuidGenerator, TimeUuidGenerator};
