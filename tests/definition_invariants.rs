//! Definition Invariant Tests
//!
//! Definitions are the only configuration a DAO accepts:
//! - Malformed definitions never produce a DAO
//! - Validation reports every failing field, deterministically
//! - A directory of definitions loads all or nothing
//! - Constraint flags and constraint statements match one to one

mod common;

use std::fs;
use std::sync::Arc;

use columndao::dao::{DaoError, EntityDao, RandomUuidGenerator};
use columndao::driver::MemoryDriver;
use columndao::schema::{
    DefinitionLoader, Entity, EntityDefinition, EntityValidator, SchemaErrorCode, SchemaValidator,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use common::{post_definition, user_definition};

fn edit_statements(definition: &mut EntityDefinition, edit: impl FnOnce(&mut Value)) {
    let mut statements = serde_json::to_value(&definition.statements).unwrap();
    edit(&mut statements);
    definition.statements = serde_json::from_value(statements).unwrap();
}

/// Builds a DAO that must be refused; returns the error and the driver.
fn refuse(definition: EntityDefinition) -> (DaoError, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let err = EntityDao::builder(definition, driver.clone(), Arc::new(RandomUuidGenerator))
        .build()
        .err()
        .unwrap();
    (err, driver)
}

// =============================================================================
// Validation
// =============================================================================

/// Every failing field is reported in one pass.
#[test]
fn test_validation_reports_every_field() {
    let schema = user_definition().schema;
    let entity = Entity::new()
        .with("id", "not-a-uuid")
        .with("handle", 7)
        .with("nickname", "ada");

    let errors = SchemaValidator::new().validate(&entity, &schema).unwrap_err();
    assert_eq!(
        errors.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["email", "handle", "id", "nickname"]
    );
    assert_eq!(errors["email"], "email is required");
    assert_eq!(errors["nickname"], "nickname is not a declared field");
}

/// Same entity, same verdict, every time.
#[test]
fn test_validation_is_deterministic() {
    let schema = user_definition().schema;
    let validator = SchemaValidator::new();
    let entity = Entity::new().with("email", json!(null));

    let first = validator.validate(&entity, &schema).unwrap_err();
    for _ in 0..100 {
        assert_eq!(validator.validate(&entity, &schema).unwrap_err(), first);
    }
}

// =============================================================================
// Loading
// =============================================================================

/// A directory loads every definition, keyed by kind.
#[test]
fn test_load_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("user.json"),
        serde_json::to_string(&user_definition()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("post.json"),
        serde_json::to_string(&post_definition()).unwrap(),
    )
    .unwrap();

    let mut loader = DefinitionLoader::new();
    assert_eq!(loader.load_dir(dir.path()).unwrap(), 2);
    assert!(loader.get("user").is_some());
    assert!(loader.get("post").is_some());
}

/// Two files declaring the same kind fail the load.
#[test]
fn test_duplicate_kind_rejected() {
    let dir = TempDir::new().unwrap();
    let text = serde_json::to_string(&user_definition()).unwrap();
    fs::write(dir.path().join("a.json"), &text).unwrap();
    fs::write(dir.path().join("b.json"), &text).unwrap();

    let err = DefinitionLoader::new().load_dir(dir.path()).unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::Duplicate);
}

// =============================================================================
// Construction
// =============================================================================

/// A statement the store rejects aborts construction entirely.
#[test]
fn test_unpreparable_statement_aborts_construction() {
    let mut definition = user_definition();
    let mut statements = serde_json::to_value(&definition.statements).unwrap();
    statements["__unique"]["handle"]["query"] = json!("SELEKT handle FROM users");
    definition.statements = serde_json::from_value(statements).unwrap();

    let result = EntityDao::builder(
        definition,
        Arc::new(MemoryDriver::new()),
        Arc::new(RandomUuidGenerator),
    )
    .build();
    let err = result.err().unwrap();
    assert_eq!(err.code(), "DAO_STATEMENT_PREPARE_FAILED");
    assert!(err.to_string().contains("__unique.handle"));
}

/// A structurally invalid schema is rejected before anything is prepared.
#[test]
fn test_schema_without_created_at_rejected() {
    let mut definition = user_definition();
    definition.schema.fields.remove("created_at");
    let driver = Arc::new(MemoryDriver::new());

    let err = EntityDao::builder(definition, driver.clone(), Arc::new(RandomUuidGenerator))
        .build()
        .err()
        .unwrap();
    assert_eq!(err.code(), "DAO_INVALID_DEFINITION");
    assert_eq!(driver.prepare_count(), 0);
}

// =============================================================================
// Constraint declarations
// =============================================================================

/// A unique field without a uniqueness statement is refused, so duplicates
/// can never slip through unchecked.
#[test]
fn test_unique_field_requires_unique_statement() {
    let mut definition = user_definition();
    edit_statements(&mut definition, |s| {
        s["__unique"].as_object_mut().unwrap().remove("handle");
    });

    let (err, driver) = refuse(definition);
    assert_eq!(err.code(), "DAO_INVALID_DEFINITION");
    assert!(err.to_string().contains("__unique.handle"));
    assert_eq!(driver.prepare_count(), 0);
}

/// Dropping the whole group is refused the same way.
#[test]
fn test_unique_fields_without_group_rejected() {
    let mut definition = user_definition();
    edit_statements(&mut definition, |s| {
        s.as_object_mut().unwrap().remove("__unique");
    });

    let err = definition.validate().unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::Malformed);
    assert!(err.message().contains("'email' declares unique"));
}

/// A uniqueness statement on a field not marked unique is refused.
#[test]
fn test_unique_statement_requires_unique_flag() {
    let mut definition = user_definition();
    if let Some(handle) = definition.schema.fields.get_mut("handle") {
        handle.unique = false;
    }

    let (err, _) = refuse(definition);
    assert_eq!(err.code(), "DAO_INVALID_DEFINITION");
    assert!(err.to_string().contains("__unique.handle"));
}

/// A reference without an existence statement is refused.
#[test]
fn test_reference_requires_exists_statement() {
    let mut definition = post_definition();
    edit_statements(&mut definition, |s| {
        s.as_object_mut().unwrap().remove("__exists");
    });

    let (err, driver) = refuse(definition);
    assert_eq!(err.code(), "DAO_INVALID_DEFINITION");
    assert!(err.to_string().contains("__exists.author_id"));
    assert_eq!(driver.prepare_count(), 0);
}

/// An existence statement on a field that references nothing is refused.
#[test]
fn test_exists_statement_requires_reference() {
    let mut definition = post_definition();
    if let Some(author) = definition.schema.fields.get_mut("author_id") {
        author.references = None;
    }

    let err = definition.validate().unwrap_err();
    assert_eq!(err.code(), SchemaErrorCode::Malformed);
    assert!(err.message().contains("does not declare a reference"));
}

// =============================================================================
// Predicate slot
// =============================================================================

/// `select` without its predicate slot is refused at load.
#[test]
fn test_select_without_slot_rejected() {
    let mut definition = user_definition();
    edit_statements(&mut definition, |s| {
        s["select"]["query"] = json!("SELECT * FROM users");
    });

    let (err, driver) = refuse(definition);
    assert_eq!(err.code(), "DAO_INVALID_DEFINITION");
    assert!(err.to_string().contains("exactly one %s slot"));
    assert_eq!(driver.prepare_count(), 0);
}

/// A second slot in any statement is refused.
#[test]
fn test_repeated_slot_rejected() {
    let mut definition = user_definition();
    edit_statements(&mut definition, |s| {
        s["select"]["query"] = json!("SELECT * FROM users %s %s");
    });
    assert!(definition.validate().is_err());

    let mut definition = user_definition();
    edit_statements(&mut definition, |s| {
        s["select_one"]["query"] = json!("SELECT * FROM users WHERE id = ? %s %s");
    });
    let err = definition.validate().unwrap_err();
    assert!(err.message().contains("select_one"));
}
