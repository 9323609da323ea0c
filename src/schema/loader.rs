//! Entity definition loader
//!
//! One JSON file per entity kind:
//!
//! ```json
//! {
//!   "schema": { "kind": "user", "fields": { "id": { "type": "identifier" }, ... } },
//!   "statements": { "insert": { "query": "...", "params": [...] }, ... }
//! }
//! ```
//!
//! Definitions are loaded once at startup and never mutated. Malformed files
//! fail the load; there is no partial registry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::statement::{TemplateNode, CORE_STATEMENTS, EXISTS_GROUP, SELECT, UNIQUE_GROUP};

use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;

/// Schema plus statement templates for one entity kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub schema: Schema,
    pub statements: TemplateNode,
}

impl EntityDefinition {
    pub fn new(schema: Schema, statements: TemplateNode) -> Self {
        Self { schema, statements }
    }

    /// Entity kind declared by the schema
    pub fn kind(&self) -> &str {
        &self.schema.kind
    }

    /// Parses a definition from JSON text
    pub fn from_json(text: &str) -> SchemaResult<Self> {
        let definition: EntityDefinition = serde_json::from_str(text)
            .map_err(|e| SchemaError::unreadable("<in-memory>", format!("Invalid JSON: {}", e)))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Checks schema structure and statement layout.
    ///
    /// - the schema itself is well-formed
    /// - every core statement is a leaf, and `select` has exactly one
    ///   predicate slot
    /// - every constraint leaf is named after a declared field
    /// - `__unique` leaves match the unique fields one to one, and
    ///   `__exists` leaves match the referencing fields one to one
    pub fn validate(&self) -> SchemaResult<()> {
        let kind = self.kind().to_string();

        self.schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed(&kind, e))?;

        for name in CORE_STATEMENTS {
            if self.statements.leaf(name).is_none() {
                return Err(SchemaError::malformed(
                    &kind,
                    format!("statement '{}' must be declared as a leaf", name),
                ));
            }
        }

        for (path, template) in self.statements.leaves() {
            let slots = template.slot_count();
            if path == SELECT && slots != 1 {
                return Err(SchemaError::malformed(
                    &kind,
                    format!("statement 'select' must contain exactly one %s slot, found {}", slots),
                ));
            }
            if slots > 1 {
                return Err(SchemaError::malformed(
                    &kind,
                    format!("statement '{}' contains {} %s slots", path, slots),
                ));
            }
        }

        let guarded = self.constraint_fields(UNIQUE_GROUP)?;
        let declared: BTreeSet<&str> = self.schema.unique_fields().collect();
        self.match_constraints(UNIQUE_GROUP, "unique", &declared, &guarded)?;

        let guarded = self.constraint_fields(EXISTS_GROUP)?;
        let declared: BTreeSet<&str> = self.schema.reference_fields().map(|(f, _)| f).collect();
        self.match_constraints(EXISTS_GROUP, "a reference", &declared, &guarded)?;

        Ok(())
    }

    /// Fields guarded by the leaves of a constraint group
    fn constraint_fields(&self, group: &str) -> SchemaResult<BTreeSet<String>> {
        let kind = self.kind();
        let Some(node) = self.statements.get(group) else {
            return Ok(BTreeSet::new());
        };
        if matches!(node, TemplateNode::Leaf(_)) {
            return Err(SchemaError::malformed(
                kind,
                format!("'{}' must be a group of statements", group),
            ));
        }

        let mut fields = BTreeSet::new();
        for (path, template) in node.leaves() {
            let field = path.rsplit('.').next().unwrap_or(path.as_str());
            if self.schema.field(field).is_none() {
                return Err(SchemaError::malformed(
                    kind,
                    format!("{}.{} names an undeclared field", group, path),
                ));
            }
            if let Some(param) = template
                .params
                .iter()
                .find(|p| self.schema.field(p).is_none())
            {
                return Err(SchemaError::malformed(
                    kind,
                    format!("{}.{} binds undeclared field '{}'", group, path, param),
                ));
            }
            fields.insert(field.to_string());
        }
        Ok(fields)
    }

    fn match_constraints(
        &self,
        group: &str,
        flag: &str,
        declared: &BTreeSet<&str>,
        guarded: &BTreeSet<String>,
    ) -> SchemaResult<()> {
        if let Some(field) = declared.iter().find(|f| !guarded.contains(**f)) {
            return Err(SchemaError::malformed(
                self.kind(),
                format!("'{}' declares {} but has no {}.{} statement", field, flag, group, field),
            ));
        }
        if let Some(field) = guarded.iter().find(|f| !declared.contains(f.as_str())) {
            return Err(SchemaError::malformed(
                self.kind(),
                format!("{}.{} guards '{}', which does not declare {}", group, field, field, flag),
            ));
        }
        Ok(())
    }
}

/// Registry of entity definitions keyed by kind.
#[derive(Debug, Default)]
pub struct DefinitionLoader {
    definitions: BTreeMap<String, EntityDefinition>,
}

impl DefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` file in `dir`, in file name order.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::unreadable(
                dir.display().to_string(),
                format!("Failed to read definition directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::unreadable(
                    dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_file(path)?;
        }

        Ok(paths.len())
    }

    /// Loads a single definition file and registers it.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<&EntityDefinition> {
        let definition = read_definition(path)?;
        self.register(definition)
    }

    /// Registers a definition directly.
    pub fn register(&mut self, definition: EntityDefinition) -> SchemaResult<&EntityDefinition> {
        definition.validate()?;

        let kind = definition.kind().to_string();
        if self.definitions.contains_key(&kind) {
            return Err(SchemaError::duplicate(kind));
        }

        Ok(self.definitions.entry(kind).or_insert(definition))
    }

    pub fn get(&self, kind: &str) -> Option<&EntityDefinition> {
        self.definitions.get(kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.definitions.values()
    }
}

/// Reads and validates one definition file without registering it.
pub fn read_definition(path: &Path) -> SchemaResult<EntityDefinition> {
    let content = fs::read_to_string(path).map_err(|e| {
        SchemaError::unreadable(path.display().to_string(), format!("Failed to read file: {}", e))
    })?;

    let definition: EntityDefinition = serde_json::from_str(&content).map_err(|e| {
        SchemaError::unreadable(path.display().to_string(), format!("Invalid JSON: {}", e))
    })?;

    definition.validate()?;
    Ok(definition)
}
