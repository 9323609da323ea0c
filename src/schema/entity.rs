//! Entity value container
//!
//! An entity is an ordered mapping of field name to JSON value. A field holding
//! `null` is present-but-null; a missing field is absent. The store sees both as
//! its NULL marker, but fetch-merge updates treat them differently.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::types::{CREATED_AT_FIELD, ID_FIELD};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an empty entity
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Sets a field, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the value only if it is present and non-null
    pub fn get_non_null(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Whether the field key exists (even if null)
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// The identifier, if assigned
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Creation time in epoch milliseconds, if assigned
    pub fn created_at(&self) -> Option<i64> {
        self.fields.get(CREATED_AT_FIELD).and_then(Value::as_i64)
    }

    /// Iterates fields in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of fields that are present and non-null
    pub fn non_null_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, _)| k.as_str())
    }
}

impl From<BTreeMap<String, Value>> for Entity {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Entity {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Renders a value for human-readable messages (strings without quotes)
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_present_but_not_non_null() {
        let entity = Entity::new().with("name", Value::Null).with("age", 3);
        assert!(entity.contains("name"));
        assert!(entity.get_non_null("name").is_none());
        assert_eq!(entity.non_null_fields().collect::<Vec<_>>(), vec!["age"]);
    }

    #[test]
    fn test_id_and_created_at_accessors() {
        let entity = Entity::new()
            .with("id", "6c0f5c4e-0000-1000-8000-000000000001")
            .with("created_at", 1_700_000_000_000i64);
        assert_eq!(entity.id(), Some("6c0f5c4e-0000-1000-8000-000000000001"));
        assert_eq!(entity.created_at(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_serde_is_a_plain_object() {
        let entity = Entity::new().with("b", 2).with("a", "x");
        let text = serde_json::to_string(&entity).unwrap();
        assert_eq!(text, r#"{"a":"x","b":2}"#);

        let back: Entity = serde_json::from_value(json!({"a": "x", "b": 2})).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn test_display_value_strips_string_quotes() {
        assert_eq!(display_value(&json!("a@b.c")), "a@b.c");
        assert_eq!(display_value(&json!(42)), "42");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
    }
}
