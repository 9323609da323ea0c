//! Schema type definitions
//!
//! Supported field types:
//! - identifier: UUID, bound as the store's typed identifier
//! - timestamp: epoch milliseconds or RFC 3339, bound as a typed timestamp
//! - text: UTF-8 string
//! - number: integer or float
//! - boolean
//! - collection: array or object, bound as canonical JSON text

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the identifier field every schema must declare
pub const ID_FIELD: &str = "id";

/// Name of the creation-time field every schema must declare
pub const CREATED_AT_FIELD: &str = "created_at";

/// Supported field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Identifier,
    Timestamp,
    Text,
    Number,
    Boolean,
    Collection,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Identifier => "identifier",
            FieldType::Timestamp => "timestamp",
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Collection => "collection",
        }
    }
}

/// Per-field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field may appear in a dynamic predicate
    #[serde(default)]
    pub queryable: bool,
    /// Whether the field's value must be unique across rows
    #[serde(default)]
    pub unique: bool,
    /// Whether the field must be present and non-null
    #[serde(default)]
    pub required: bool,
    /// Entity kind this field references by identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl FieldSpec {
    /// Creates an optional, non-queryable field of the given type
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            queryable: false,
            unique: false,
            required: false,
            references: None,
        }
    }

    pub fn queryable(mut self) -> Self {
        self.queryable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as a reference to another entity kind
    pub fn references(mut self, kind: impl Into<String>) -> Self {
        self.references = Some(kind.into());
        self
    }
}

/// Schema for one entity kind. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Entity kind this schema describes
    pub kind: String,
    /// Field descriptors in name order
    pub fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    /// Create a new schema
    pub fn new(kind: impl Into<String>, fields: BTreeMap<String, FieldSpec>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    /// Looks up a field descriptor
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Whether `name` may appear in a dynamic predicate.
    ///
    /// The identifier field is always queryable.
    pub fn is_queryable(&self, name: &str) -> bool {
        name == ID_FIELD || self.field(name).map_or(false, |f| f.queryable)
    }

    /// Fields declared unique, in name order
    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.unique)
            .map(|(name, _)| name.as_str())
    }

    /// Fields declaring a reference, with the referenced kind
    pub fn reference_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|(name, spec)| {
            spec.references
                .as_deref()
                .map(|kind| (name.as_str(), kind))
        })
    }

    /// Validates the schema structure itself (not an entity)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.kind.trim().is_empty() {
            return Err("Schema kind must not be empty".into());
        }

        match self.fields.get(ID_FIELD) {
            Some(spec) if spec.field_type == FieldType::Identifier => {}
            Some(spec) => {
                return Err(format!(
                    "'{}' field must be an identifier, found {}",
                    ID_FIELD,
                    spec.field_type.type_name()
                ))
            }
            None => return Err(format!("Schema must define an '{}' field", ID_FIELD)),
        }

        match self.fields.get(CREATED_AT_FIELD) {
            Some(spec) if spec.field_type == FieldType::Timestamp => {}
            Some(spec) => {
                return Err(format!(
                    "'{}' field must be a timestamp, found {}",
                    CREATED_AT_FIELD,
                    spec.field_type.type_name()
                ))
            }
            None => {
                return Err(format!(
                    "Schema must define a '{}' field",
                    CREATED_AT_FIELD
                ))
            }
        }

        for (name, spec) in &self.fields {
            if spec.references.is_some() && spec.field_type != FieldType::Identifier {
                return Err(format!(
                    "'{}' references another entity but is declared {}",
                    name,
                    spec.field_type.type_name()
                ));
            }
        }

        Ok(())
    }
}
