//! Constraint enforcer
//!
//! Runs the `__unique` and `__exists` statement groups of an entity kind
//! against the store. Each leaf's name (last path segment) is the field it
//! guards.

use std::sync::Arc;

use crate::codec::{Row, ValueEncoder, WireValue};
use crate::driver::{Driver, ExecuteOptions};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{display_value, Entity, FieldErrors, Schema, ID_FIELD};
use crate::statement::{PreparedStatement, StatementNode, EXISTS_GROUP, UNIQUE_GROUP};

use super::errors::ConstraintResult;

/// Outcome of a batch of constraint checks.
///
/// An empty report means every check passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintReport {
    violations: FieldErrors,
}

impl ConstraintReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Field name to human-readable message
    pub fn violations(&self) -> &FieldErrors {
        &self.violations
    }

    pub fn into_violations(self) -> FieldErrors {
        self.violations
    }

    fn reject(&mut self, field: &str, message: String) {
        self.violations.insert(field.to_string(), message);
    }
}

/// A constraint statement and the field it guards
#[derive(Debug, Clone)]
struct GuardedStatement {
    field: String,
    statement: Arc<PreparedStatement>,
}

pub struct ConstraintEnforcer {
    driver: Arc<dyn Driver>,
    schema: Arc<Schema>,
    encoder: ValueEncoder,
    unique: Vec<GuardedStatement>,
    exists: Vec<GuardedStatement>,
}

impl ConstraintEnforcer {
    /// Collects the constraint groups of a compiled statement tree.
    ///
    /// Missing groups mean the kind declares no constraints of that sort.
    pub fn new(driver: Arc<dyn Driver>, schema: Arc<Schema>, statements: &StatementNode) -> Self {
        Self {
            driver,
            schema,
            encoder: ValueEncoder::new(),
            unique: guarded(statements, UNIQUE_GROUP),
            exists: guarded(statements, EXISTS_GROUP),
        }
    }

    /// Fields with a uniqueness lookup, in name order
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.unique.iter().map(|g| g.field.as_str())
    }

    /// Fields with an existence lookup, in name order
    pub fn reference_fields(&self) -> impl Iterator<Item = &str> {
        self.exists.iter().map(|g| g.field.as_str())
    }

    /// Runs a lookup; found iff at least one row comes back.
    pub fn check_exists(
        &self,
        statement: &PreparedStatement,
        values: &[WireValue],
    ) -> ConstraintResult<(bool, Vec<Row>)> {
        let rows = self
            .driver
            .execute(statement.handle, values, &ExecuteOptions::default())?
            .into_rows()
            .rows;
        Ok((!rows.is_empty(), rows))
    }

    /// Looks up rows sharing the entity's value for the statement's params.
    ///
    /// With `is_update`, rows whose id equals the entity's own id do not
    /// count as conflicts. A null bound value cannot collide and passes
    /// without a lookup.
    pub fn check_unique(
        &self,
        statement: &PreparedStatement,
        entity: &Entity,
        is_update: bool,
    ) -> ConstraintResult<bool> {
        let values = self.encoder.encode(&self.schema, entity, &statement.params)?;
        if values.iter().any(WireValue::is_null) {
            return Ok(true);
        }

        let (found, rows) = self.check_exists(statement, &values)?;
        if !found {
            return Ok(true);
        }
        if !is_update {
            return Ok(false);
        }

        let own_id = entity.id().and_then(|id| uuid::Uuid::parse_str(id).ok());
        Ok(own_id.is_some() && rows.iter().all(|row| row_id(row) == own_id))
    }

    /// Checks every unique field, reporting all conflicts together.
    pub fn check_all_unique(
        &self,
        entity: &Entity,
        is_update: bool,
    ) -> ConstraintResult<ConstraintReport> {
        let mut report = ConstraintReport::default();
        for guard in &self.unique {
            let Some(value) = entity.get_non_null(&guard.field) else {
                continue;
            };
            if !self.check_unique(&guard.statement, entity, is_update)? {
                let message = format!(
                    "{} already exists with value {}",
                    guard.field,
                    display_value(value)
                );
                self.log_violation("unique", &guard.field);
                report.reject(&guard.field, message);
            }
        }
        Ok(report)
    }

    /// Checks every reference the entity carries. Absent or null references
    /// are skipped; required-ness belongs to validation.
    pub fn check_all_exists(&self, entity: &Entity) -> ConstraintResult<ConstraintReport> {
        let mut report = ConstraintReport::default();
        for guard in &self.exists {
            let Some(value) = entity.get_non_null(&guard.field) else {
                continue;
            };
            let values = self
                .encoder
                .encode(&self.schema, entity, &guard.statement.params)?;
            let (found, _) = self.check_exists(&guard.statement, &values)?;
            if !found {
                let message = format!("{} {} does not exist", guard.field, display_value(value));
                self.log_violation("exists", &guard.field);
                report.reject(&guard.field, message);
            }
        }
        Ok(report)
    }

    fn log_violation(&self, constraint: &str, field: &str) {
        log_event_with_fields(
            Event::ConstraintViolated,
            &[
                ("constraint", constraint),
                ("field", field),
                ("kind", self.schema.kind.as_str()),
            ],
        );
    }
}

fn guarded(statements: &StatementNode, group: &str) -> Vec<GuardedStatement> {
    let Some(node) = statements.get(group) else {
        return Vec::new();
    };
    node.leaves()
        .into_iter()
        .map(|(path, statement)| GuardedStatement {
            field: path.rsplit('.').next().unwrap_or(path.as_str()).to_string(),
            statement,
        })
        .collect()
}

fn row_id(row: &Row) -> Option<uuid::Uuid> {
    match row.get(ID_FIELD)? {
        WireValue::Uuid(id) => Some(*id),
        WireValue::Text(text) => uuid::Uuid::parse_str(text).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintError;
    use crate::driver::MemoryDriver;
    use crate::observability::DaoMetrics;
    use crate::schema::EntityDefinition;
    use crate::statement::StatementCompiler;
    use serde_json::json;

    const ALICE: &str = "6f1c2b1e-3c4d-11ee-be56-0242ac120002";
    const BOB: &str = "7a2d3c2f-3c4d-11ee-be56-0242ac120002";

    struct Fixture {
        driver: Arc<MemoryDriver>,
        enforcer: ConstraintEnforcer,
        statements: StatementNode,
    }

    fn fixture() -> Fixture {
        let definition = EntityDefinition::from_json(
            &json!({
                "schema": {
                    "kind": "post",
                    "fields": {
                        "id": { "type": "identifier" },
                        "created_at": { "type": "timestamp" },
                        "slug": { "type": "text", "unique": true, "queryable": true },
                        "author_id": { "type": "identifier", "references": "user" }
                    }
                },
                "statements": {
                    "insert": { "query": "INSERT INTO posts (id, created_at, slug, author_id) VALUES (?, ?, ?, ?)", "params": ["id", "created_at", "slug", "author_id"] },
                    "update": { "query": "UPDATE posts SET slug = ?, author_id = ? WHERE id = ?", "params": ["slug", "author_id", "id"] },
                    "select_one": { "query": "SELECT * FROM posts WHERE id = ?", "params": ["id"] },
                    "select": { "query": "SELECT * FROM posts %s", "params": [] },
                    "delete": { "query": "DELETE FROM posts WHERE id = ?", "params": ["id"] },
                    "__unique": {
                        "slug": { "query": "SELECT * FROM posts WHERE slug = ? ALLOW FILTERING", "params": ["slug"] }
                    },
                    "__exists": {
                        "author_id": { "query": "SELECT * FROM users WHERE id = ?", "params": ["author_id"] }
                    }
                }
            })
            .to_string(),
        )
        .unwrap();

        let driver = Arc::new(MemoryDriver::new());
        let compiler = StatementCompiler::new(driver.clone(), Arc::new(DaoMetrics::new()));
        let statements = compiler.compile_all(&definition.statements).unwrap();
        let enforcer =
            ConstraintEnforcer::new(driver.clone(), Arc::new(definition.schema), &statements);
        Fixture {
            driver,
            enforcer,
            statements,
        }
    }

    fn store(fixture: &Fixture, query: &str, values: Vec<WireValue>) {
        let handle = fixture.driver.prepare(query).unwrap();
        fixture
            .driver
            .execute(handle, &values, &ExecuteOptions::default())
            .unwrap();
    }

    fn uuid(text: &str) -> WireValue {
        WireValue::Uuid(uuid::Uuid::parse_str(text).unwrap())
    }

    fn seed_post(fixture: &Fixture, id: &str, slug: &str) {
        store(
            fixture,
            "INSERT INTO posts (id, slug) VALUES (?, ?)",
            vec![uuid(id), WireValue::Text(slug.into())],
        );
    }

    fn seed_user(fixture: &Fixture, id: &str) {
        store(fixture, "INSERT INTO users (id) VALUES (?)", vec![uuid(id)]);
    }

    #[test]
    fn test_groups_collected_by_field() {
        let f = fixture();
        assert_eq!(f.enforcer.unique_fields().collect::<Vec<_>>(), vec!["slug"]);
        assert_eq!(
            f.enforcer.reference_fields().collect::<Vec<_>>(),
            vec!["author_id"]
        );
    }

    #[test]
    fn test_check_exists_reports_rows() {
        let f = fixture();
        seed_user(&f, ALICE);
        let statement = f.statements.leaf("__exists.author_id").unwrap();

        let (found, rows) = f.enforcer.check_exists(statement, &[uuid(ALICE)]).unwrap();
        assert!(found);
        assert_eq!(rows.len(), 1);

        let (found, rows) = f.enforcer.check_exists(statement, &[uuid(BOB)]).unwrap();
        assert!(!found);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unique_conflict_on_insert() {
        let f = fixture();
        seed_post(&f, ALICE, "hello");
        let statement = f.statements.leaf("__unique.slug").unwrap();

        let draft = Entity::new().with("id", BOB).with("slug", "hello");
        assert!(!f.enforcer.check_unique(statement, &draft, false).unwrap());

        let fresh = Entity::new().with("id", BOB).with("slug", "other");
        assert!(f.enforcer.check_unique(statement, &fresh, false).unwrap());
    }

    #[test]
    fn test_update_excludes_own_row() {
        let f = fixture();
        seed_post(&f, ALICE, "hello");
        let statement = f.statements.leaf("__unique.slug").unwrap();

        let own = Entity::new().with("id", ALICE).with("slug", "hello");
        assert!(f.enforcer.check_unique(statement, &own, true).unwrap());

        let other = Entity::new().with("id", BOB).with("slug", "hello");
        assert!(!f.enforcer.check_unique(statement, &other, true).unwrap());
    }

    #[test]
    fn test_null_unique_value_skips_lookup() {
        let f = fixture();
        let statement = f.statements.leaf("__unique.slug").unwrap();
        let before = f.driver.execute_count();

        let entity = Entity::new().with("id", ALICE).with("slug", json!(null));
        assert!(f.enforcer.check_unique(statement, &entity, false).unwrap());
        assert_eq!(f.driver.execute_count(), before);
    }

    #[test]
    fn test_check_all_unique_message() {
        let f = fixture();
        seed_post(&f, ALICE, "hello");

        let draft = Entity::new().with("id", BOB).with("slug", "hello");
        let report = f.enforcer.check_all_unique(&draft, false).unwrap();
        assert!(!report.passed());
        assert_eq!(
            report.violations().get("slug").map(String::as_str),
            Some("slug already exists with value hello")
        );
    }

    #[test]
    fn test_check_all_exists_skips_absent_reference() {
        let f = fixture();
        let before = f.driver.execute_count();
        let report = f
            .enforcer
            .check_all_exists(&Entity::new().with("slug", "x"))
            .unwrap();
        assert!(report.passed());
        assert_eq!(f.driver.execute_count(), before);
    }

    #[test]
    fn test_check_all_exists_reports_missing_reference() {
        let f = fixture();
        seed_user(&f, ALICE);

        let ok = Entity::new().with("author_id", ALICE);
        assert!(f.enforcer.check_all_exists(&ok).unwrap().passed());

        let dangling = Entity::new().with("author_id", BOB);
        let report = f.enforcer.check_all_exists(&dangling).unwrap();
        assert_eq!(
            report.violations().get("author_id").map(String::as_str),
            Some(format!("author_id {} does not exist", BOB).as_str())
        );
    }

    #[test]
    fn test_driver_error_aborts_check() {
        let f = fixture();
        f.driver.fail_statements_containing("FROM users");

        let entity = Entity::new().with("author_id", ALICE);
        let err = f.enforcer.check_all_exists(&entity).unwrap_err();
        assert!(matches!(err, ConstraintError::Driver(_)));
    }

    #[test]
    fn test_malformed_reference_is_encode_error() {
        let f = fixture();
        let entity = Entity::new().with("author_id", "not-a-uuid");
        let err = f.enforcer.check_all_exists(&entity).unwrap_err();
        assert!(matches!(err, ConstraintError::Encode(_)));
    }
}
