//! Entity validation against a schema
//!
//! Validation semantics:
//! - Required fields are present and non-null
//! - No undeclared fields exist
//! - Field values match their declared type, without coercion
//!
//! Every failing field is reported; validation does not stop at the first error.

use chrono::DateTime;
use serde_json::Value;
use uuid::Uuid;

use super::entity::Entity;
use super::errors::FieldErrors;
use super::types::{FieldSpec, FieldType, Schema};

/// Validation contract consumed by the DAO.
///
/// Implementations must be pure: no I/O and no mutation of the entity.
pub trait EntityValidator: Send + Sync {
    /// Returns `Err` with one message per failing field.
    fn validate(&self, entity: &Entity, schema: &Schema) -> Result<(), FieldErrors>;
}

/// Default validator enforcing presence, declaration and type rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Checks a single value against its field descriptor.
    fn validate_value(field: &str, value: &Value, spec: &FieldSpec) -> Result<(), String> {
        let ok = match spec.field_type {
            FieldType::Identifier => value
                .as_str()
                .map_or(false, |s| Uuid::parse_str(s).is_ok()),
            FieldType::Timestamp => match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                Value::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
                _ => false,
            },
            FieldType::Text => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Collection => value.is_array() || value.is_object(),
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "{} must be a valid {}, got {}",
                field,
                spec.field_type.type_name(),
                json_type_name(value)
            ))
        }
    }
}

impl EntityValidator for SchemaValidator {
    fn validate(&self, entity: &Entity, schema: &Schema) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        // Undeclared fields
        for (field, _) in entity.iter() {
            if schema.field(field).is_none() {
                errors.insert(field.to_string(), format!("{} is not a declared field", field));
            }
        }

        for (field, spec) in &schema.fields {
            match entity.get(field) {
                Some(Value::Null) | None => {
                    if spec.required {
                        errors.insert(field.clone(), format!("{} is required", field));
                    }
                }
                Some(value) => {
                    if let Err(msg) = Self::validate_value(field, value, spec) {
                        errors.insert(field.clone(), msg);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{CREATED_AT_FIELD, ID_FIELD};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schema() -> Schema {
        let mut fields = BTreeMap::new();
        fields.insert(ID_FIELD.into(), FieldSpec::new(FieldType::Identifier).required());
        fields.insert(CREATED_AT_FIELD.into(), FieldSpec::new(FieldType::Timestamp));
        fields.insert("name".into(), FieldSpec::new(FieldType::Text).required());
        fields.insert("score".into(), FieldSpec::new(FieldType::Number));
        fields.insert("active".into(), FieldSpec::new(FieldType::Boolean));
        fields.insert("tags".into(), FieldSpec::new(FieldType::Collection));
        Schema::new("player", fields)
    }

    fn valid() -> Entity {
        Entity::new()
            .with("id", "9f1c1c1e-5b8a-11ee-8c99-0242ac120002")
            .with("created_at", 1_700_000_000_000i64)
            .with("name", "ada")
            .with("score", 1.5)
            .with("active", true)
            .with("tags", json!(["a", "b"]))
    }

    #[test]
    fn test_valid_entity_passes() {
        assert!(SchemaValidator::new().validate(&valid(), &schema()).is_ok());
    }

    #[test]
    fn test_all_failures_reported_together() {
        let entity = valid()
            .with("name", Value::Null)
            .with("score", "high")
            .with("extra", 1);
        let errors = SchemaValidator::new().validate(&entity, &schema()).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors["name"], "name is required");
        assert!(errors["score"].contains("number"));
        assert!(errors["extra"].contains("not a declared field"));
    }

    #[test]
    fn test_identifier_must_be_uuid() {
        let entity = valid().with("id", "not-a-uuid");
        let errors = SchemaValidator::new().validate(&entity, &schema()).unwrap_err();
        assert!(errors["id"].contains("identifier"));
    }

    #[test]
    fn test_timestamp_accepts_rfc3339_and_integers() {
        let validator = SchemaValidator::new();
        assert!(validator
            .validate(&valid().with("created_at", "2024-01-02T03:04:05Z"), &schema())
            .is_ok());
        assert!(validator
            .validate(&valid().with("created_at", 1_700_000_000i64), &schema())
            .is_ok());
        assert!(validator
            .validate(&valid().with("created_at", "yesterday"), &schema())
            .is_err());
    }

    #[test]
    fn test_collection_accepts_objects() {
        let entity = valid().with("tags", json!({"k": "v"}));
        assert!(SchemaValidator::new().validate(&entity, &schema()).is_ok());
    }

    #[test]
    fn test_optional_field_may_be_absent_or_null() {
        let mut entity = valid().with("score", Value::Null);
        entity.remove("tags");
        assert!(SchemaValidator::new().validate(&entity, &schema()).is_ok());
    }
}
