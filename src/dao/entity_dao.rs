//! Entity DAO
//!
//! Public CRUD surface for one entity kind. Each mutation runs, in order:
//! identity assignment, validation, uniqueness checks, reference checks,
//! encoding, and the mutating statement. A rejection at any step leaves the
//! store untouched.
//!
//! The DAO holds no entity data between calls. Its only state is the
//! compiled statement tree and the predicate statement cache.

use std::sync::Arc;

use chrono::Utc;

use crate::codec::ValueEncoder;
use crate::constraint::{ConstraintEnforcer, ConstraintError};
use crate::driver::{Driver, DriverError, ExecResult, ExecuteOptions, PagingState};
use crate::observability::{log_event_with_fields, DaoMetrics, Event};
use crate::schema::{
    Entity, EntityDefinition, EntityValidator, FieldErrors, Schema, SchemaValidator,
    CREATED_AT_FIELD, ID_FIELD,
};
use crate::statement::{
    PreparedStatement, StatementCompiler, StatementError, StatementNode, StatementTemplate,
    CORE_STATEMENTS, DELETE, INSERT, SELECT, SELECT_ONE, UPDATE,
};

use super::config::DaoConfig;
use super::errors::{DaoError, DaoResult};
use super::identity::IdGenerator;

/// One page of a scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub entities: Vec<Entity>,
    /// Present iff more rows remain
    pub paging_state: Option<PagingState>,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.paging_state.is_some()
    }
}

/// Builds an [`EntityDao`], preparing every declared statement.
pub struct EntityDaoBuilder {
    definition: EntityDefinition,
    driver: Arc<dyn Driver>,
    ids: Arc<dyn IdGenerator>,
    validator: Box<dyn EntityValidator>,
    config: DaoConfig,
    metrics: Arc<DaoMetrics>,
}

impl EntityDaoBuilder {
    pub fn validator(mut self, validator: impl EntityValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn config(mut self, config: DaoConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a counter registry across DAOs
    pub fn metrics(mut self, metrics: Arc<DaoMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Validates the definition and prepares every statement.
    ///
    /// Any failure returns an error and no DAO; there is no partially
    /// prepared state.
    pub fn build(self) -> DaoResult<EntityDao> {
        let kind = self.definition.kind().to_string();
        match self.try_build() {
            Ok(dao) => {
                let statements = dao.statements.leaves().len().to_string();
                log_event_with_fields(
                    Event::DaoReady,
                    &[("kind", kind.as_str()), ("statements", statements.as_str())],
                );
                Ok(dao)
            }
            Err(err) => {
                log_event_with_fields(
                    Event::DaoStartFailed,
                    &[
                        ("code", err.code()),
                        ("kind", kind.as_str()),
                        ("reason", err.to_string().as_str()),
                    ],
                );
                Err(err)
            }
        }
    }

    fn try_build(self) -> DaoResult<EntityDao> {
        self.config.validate()?;
        self.definition
            .validate()
            .map_err(|e| DaoError::Definition(e.to_string()))?;

        let compiler = StatementCompiler::new(Arc::clone(&self.driver), Arc::clone(&self.metrics))
            .with_allow_filtering(self.config.allow_filtering);
        let statements = compiler
            .compile_all(&self.definition.statements)
            .map_err(DaoError::StatementPrepare)?;

        for name in CORE_STATEMENTS {
            if statements.leaf(name).is_none() {
                return Err(DaoError::StatementPrepare(StatementError::Missing(
                    name.to_string(),
                )));
            }
        }
        let select = self
            .definition
            .statements
            .leaf(SELECT)
            .cloned()
            .ok_or_else(|| DaoError::StatementPrepare(StatementError::Missing(SELECT.into())))?;

        let schema = Arc::new(self.definition.schema);
        let enforcer =
            ConstraintEnforcer::new(Arc::clone(&self.driver), Arc::clone(&schema), &statements);

        Ok(EntityDao {
            schema,
            driver: self.driver,
            ids: self.ids,
            validator: self.validator,
            config: self.config,
            metrics: self.metrics,
            encoder: ValueEncoder::new(),
            compiler,
            statements,
            select,
            enforcer,
        })
    }
}

pub struct EntityDao {
    schema: Arc<Schema>,
    driver: Arc<dyn Driver>,
    ids: Arc<dyn IdGenerator>,
    validator: Box<dyn EntityValidator>,
    config: DaoConfig,
    metrics: Arc<DaoMetrics>,
    encoder: ValueEncoder,
    compiler: StatementCompiler,
    statements: StatementNode,
    /// Base template for predicate statements
    select: StatementTemplate,
    enforcer: ConstraintEnforcer,
}

impl EntityDao {
    /// Starts a builder with the default validator and configuration
    pub fn builder(
        definition: EntityDefinition,
        driver: Arc<dyn Driver>,
        ids: Arc<dyn IdGenerator>,
    ) -> EntityDaoBuilder {
        EntityDaoBuilder {
            definition,
            driver,
            ids,
            validator: Box::new(SchemaValidator::new()),
            config: DaoConfig::default(),
            metrics: Arc::new(DaoMetrics::new()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.schema.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn statements(&self) -> &StatementNode {
        &self.statements
    }

    pub fn metrics(&self) -> &Arc<DaoMetrics> {
        &self.metrics
    }

    /// Distinct prepared statements, static and dynamic
    pub fn cached_statements(&self) -> usize {
        self.compiler.cached_statements()
    }

    /// Persists a new entity under a freshly minted id.
    ///
    /// Any caller-supplied `id` or `created_at` is overwritten.
    pub fn insert(&self, draft: Entity) -> DaoResult<Entity> {
        if draft.is_empty() {
            return Err(DaoError::NilEntity);
        }

        let mut entity = draft;
        entity.set(ID_FIELD, self.ids.next_id().to_string());
        entity.set(CREATED_AT_FIELD, Utc::now().timestamp_millis());

        self.validate(&entity)?;
        self.enforce(&entity, false)?;
        self.execute(self.core(INSERT)?, &entity, ExecuteOptions::default())?;

        self.metrics.increment_inserts();
        self.log_mutation(Event::EntityInserted, &entity);
        Ok(entity)
    }

    /// Overwrites a stored entity with `patch` merged over its current row.
    ///
    /// Fields absent from the patch keep their stored values; a field
    /// present as null is cleared. `id` selects the row and `created_at`
    /// always keeps its stored value.
    pub fn update(&self, patch: Entity) -> DaoResult<Entity> {
        if patch.is_empty() {
            return Err(DaoError::NilEntity);
        }
        let id = match patch.id() {
            Some(id) => id.to_string(),
            None => {
                let err = DaoError::invalid_field(ID_FIELD, "id is required for update");
                self.reject_validation(&err);
                return Err(err);
            }
        };

        let stored = self.fetch(&id)?.ok_or_else(|| DaoError::not_found(&id))?;

        let mut merged = patch;
        for (field, value) in stored.iter() {
            if !merged.contains(field) {
                merged.set(field, value.clone());
            }
        }
        match stored.get(CREATED_AT_FIELD) {
            Some(created_at) => {
                merged.set(CREATED_AT_FIELD, created_at.clone());
            }
            None => {
                merged.remove(CREATED_AT_FIELD);
            }
        }

        self.validate(&merged)?;
        self.enforce(&merged, true)?;
        self.execute(self.core(UPDATE)?, &merged, ExecuteOptions::default())?;

        self.metrics.increment_updates();
        self.log_mutation(Event::EntityUpdated, &merged);
        Ok(merged)
    }

    /// The stored entity with this id, or `None`
    pub fn find_one(&self, id: &str) -> DaoResult<Option<Entity>> {
        self.metrics.increment_finds();
        self.fetch(id)
    }

    /// Pages through entities matching every non-null field of `keys`.
    ///
    /// Only queryable fields and `id` may be used. A `page_size` of 0 selects
    /// the configured default.
    pub fn find_by_keys(
        &self,
        keys: &Entity,
        page_size: usize,
        paging_state: Option<PagingState>,
    ) -> DaoResult<Page> {
        let fields: Vec<&str> = keys.non_null_fields().collect();
        let statement = self.resolve_predicate(&fields)?;

        let options = ExecuteOptions::paged(self.config.resolve_page_size(page_size), paging_state);
        let rows = self.execute(&statement, keys, options)?.into_rows();

        let entities = rows
            .rows
            .iter()
            .map(|row| self.encoder.decode_row(&self.schema, row))
            .collect::<Result<Vec<_>, _>>()?;

        self.metrics.increment_finds();
        Ok(Page {
            entities,
            paging_state: rows.paging_state,
        })
    }

    /// The statement a predicate over `fields` runs, preparing it on first use
    pub fn resolve_predicate(&self, fields: &[&str]) -> DaoResult<Arc<PreparedStatement>> {
        self.compiler
            .resolve_dynamic(&self.select, &self.schema, fields)
            .map_err(|e| self.dynamic_failed(e))
    }

    /// Pages through every entity of this kind
    pub fn find(&self, page_size: usize, paging_state: Option<PagingState>) -> DaoResult<Page> {
        self.find_by_keys(&Entity::new(), page_size, paging_state)
    }

    /// Deletes a stored entity, returning the store's acknowledgment.
    ///
    /// A missing id is `NotFound` and no DELETE is issued.
    pub fn delete(&self, id: &str) -> DaoResult<bool> {
        if self.fetch(id)?.is_none() {
            return Err(DaoError::not_found(id));
        }

        let key = Entity::new().with(ID_FIELD, id);
        let acknowledged = self
            .execute(self.core(DELETE)?, &key, ExecuteOptions::default())?
            .acknowledged();

        self.metrics.increment_deletes();
        log_event_with_fields(
            Event::EntityDeleted,
            &[("id", id), ("kind", self.kind())],
        );
        Ok(acknowledged)
    }

    /// Reads one row by id through the select-one statement
    fn fetch(&self, id: &str) -> DaoResult<Option<Entity>> {
        let statement = self.core(SELECT_ONE)?;
        let key = Entity::new().with(ID_FIELD, id);
        let values = self.encoder.encode(&self.schema, &key, &statement.params)?;

        let (found, rows) = self
            .enforcer
            .check_exists(statement, &values)
            .map_err(|e| self.constraint_failed(e))?;
        if !found {
            return Ok(None);
        }
        rows.first()
            .map(|row| self.encoder.decode_row(&self.schema, row))
            .transpose()
            .map_err(DaoError::from)
    }

    fn validate(&self, entity: &Entity) -> DaoResult<()> {
        self.validator
            .validate(entity, &self.schema)
            .map_err(|errors| {
                let err = DaoError::Validation(errors);
                self.reject_validation(&err);
                err
            })
    }

    fn enforce(&self, entity: &Entity, is_update: bool) -> DaoResult<()> {
        let unique = self
            .enforcer
            .check_all_unique(entity, is_update)
            .map_err(|e| self.constraint_failed(e))?;
        if !unique.passed() {
            self.metrics.increment_constraint_violations();
            return Err(DaoError::Uniqueness(unique.into_violations()));
        }

        let exists = self
            .enforcer
            .check_all_exists(entity)
            .map_err(|e| self.constraint_failed(e))?;
        if !exists.passed() {
            self.metrics.increment_constraint_violations();
            return Err(DaoError::ForeignKey(exists.into_violations()));
        }
        Ok(())
    }

    fn execute(
        &self,
        statement: &PreparedStatement,
        entity: &Entity,
        options: ExecuteOptions,
    ) -> DaoResult<ExecResult> {
        let values = self.encoder.encode(&self.schema, entity, &statement.params)?;
        self.driver
            .execute(statement.handle, &values, &options)
            .map_err(|e| self.driver_failed(e))
    }

    fn core(&self, name: &str) -> DaoResult<&PreparedStatement> {
        self.statements
            .leaf(name)
            .map(|statement| statement.as_ref())
            .ok_or_else(|| DaoError::StatementPrepare(StatementError::Missing(name.to_string())))
    }

    fn dynamic_failed(&self, err: StatementError) -> DaoError {
        match err {
            StatementError::NotQueryable(fields) => {
                let errors: FieldErrors = fields
                    .into_iter()
                    .map(|f| {
                        let message = format!("{} is not queryable", f);
                        (f, message)
                    })
                    .collect();
                let err = DaoError::Validation(errors);
                self.reject_validation(&err);
                err
            }
            StatementError::Prepare { source, .. } => self.driver_failed(source),
            other => DaoError::StatementPrepare(other),
        }
    }

    fn constraint_failed(&self, err: ConstraintError) -> DaoError {
        match err {
            ConstraintError::Driver(e) => self.driver_failed(e),
            ConstraintError::Encode(e) => DaoError::Encode(e),
        }
    }

    fn driver_failed(&self, err: DriverError) -> DaoError {
        self.metrics.increment_driver_failures();
        log_event_with_fields(
            Event::DriverFailed,
            &[("kind", self.kind()), ("reason", err.to_string().as_str())],
        );
        DaoError::Driver(err)
    }

    fn reject_validation(&self, err: &DaoError) {
        self.metrics.increment_validation_failures();
        let fields = err
            .field_errors()
            .map(|e| e.keys().cloned().collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        log_event_with_fields(
            Event::ValidationRejected,
            &[("fields", fields.as_str()), ("kind", self.kind())],
        );
    }

    fn log_mutation(&self, event: Event, entity: &Entity) {
        log_event_with_fields(
            event,
            &[("id", entity.id().unwrap_or_default()), ("kind", self.kind())],
        );
    }
}
