//! Value encoder
//!
//! Maps entity values to the store's typed wire values using the schema's
//! declared field types, and maps returned rows back to entities.
//!
//! Rules:
//! - identifier: string parsed as UUID
//! - timestamp: epoch number or RFC 3339 string; 10-digit epochs are seconds
//!   and are promoted to milliseconds
//! - collection: serialized to canonical JSON text
//! - absent or null: the store's NULL marker, never an omitted column

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use uuid::Uuid;

use crate::schema::{Entity, FieldSpec, FieldType, Schema};

use super::errors::{CodecResult, EncodeError};
use super::wire::{Row, WireValue};

/// Digit count that marks an epoch value as seconds rather than milliseconds
const EPOCH_SECONDS_DIGITS: u32 = 10;

/// Stateless schema-driven encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueEncoder;

impl ValueEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encodes the named fields of `entity`, in order.
    ///
    /// Fails on the first field that cannot be encoded; no field is dropped.
    pub fn encode(
        &self,
        schema: &Schema,
        entity: &Entity,
        fields: &[String],
    ) -> CodecResult<Vec<WireValue>> {
        fields
            .iter()
            .map(|field| self.encode_field(schema, field, entity.get(field)))
            .collect()
    }

    /// Encodes one field value.
    pub fn encode_field(
        &self,
        schema: &Schema,
        field: &str,
        value: Option<&Value>,
    ) -> CodecResult<WireValue> {
        let spec = schema
            .field(field)
            .ok_or_else(|| EncodeError::new(field, "field is not declared in the schema"))?;

        let value = match value {
            None | Some(Value::Null) => return Ok(WireValue::Null),
            Some(v) => v,
        };

        match spec.field_type {
            FieldType::Identifier => encode_identifier(field, value),
            FieldType::Timestamp => encode_timestamp(field, value),
            FieldType::Text => match value {
                Value::String(s) => Ok(WireValue::Text(s.clone())),
                other => Err(mismatch(field, "text", other)),
            },
            FieldType::Number => match value {
                Value::Number(n) => Ok(encode_number(n)),
                other => Err(mismatch(field, "number", other)),
            },
            FieldType::Boolean => match value {
                Value::Bool(b) => Ok(WireValue::Boolean(*b)),
                other => Err(mismatch(field, "boolean", other)),
            },
            FieldType::Collection => serde_json::to_string(value)
                .map(WireValue::Text)
                .map_err(|e| EncodeError::new(field, format!("cannot serialize collection: {}", e))),
        }
    }

    /// Decodes a row into an entity. NULL columns are left absent.
    pub fn decode_row(&self, schema: &Schema, row: &Row) -> CodecResult<Entity> {
        let mut entity = Entity::new();
        for (column, wire) in row {
            if wire.is_null() {
                continue;
            }
            let value = self.decode_value(schema.field(column), column, wire)?;
            entity.set(column.clone(), value);
        }
        Ok(entity)
    }

    /// Decodes one wire value. Columns the schema does not declare decode by
    /// wire type alone.
    pub fn decode_value(
        &self,
        spec: Option<&FieldSpec>,
        field: &str,
        wire: &WireValue,
    ) -> CodecResult<Value> {
        let value = match wire {
            WireValue::Null => Value::Null,
            WireValue::Uuid(u) => Value::String(u.to_string()),
            WireValue::Timestamp(t) => Value::from(t.timestamp_millis()),
            WireValue::Text(s) => match spec.map(|f| f.field_type) {
                Some(FieldType::Collection) => serde_json::from_str(s).map_err(|e| {
                    EncodeError::new(field, format!("stored collection is not valid JSON: {}", e))
                })?,
                _ => Value::String(s.clone()),
            },
            WireValue::Int(i) => Value::from(*i),
            WireValue::Double(d) => Number::from_f64(*d)
                .map(Value::Number)
                .ok_or_else(|| EncodeError::new(field, "stored double is not finite"))?,
            WireValue::Boolean(b) => Value::Bool(*b),
        };
        Ok(value)
    }
}

/// Promotes a 10-digit epoch-seconds value to milliseconds.
///
/// Values of any other magnitude are taken as milliseconds already.
pub fn normalize_epoch_millis(value: i64) -> i64 {
    if digit_count(value.unsigned_abs()) == EPOCH_SECONDS_DIGITS {
        value * 1000
    } else {
        value
    }
}

fn digit_count(n: u64) -> u32 {
    n.checked_ilog10().map_or(1, |log| log + 1)
}

fn encode_identifier(field: &str, value: &Value) -> CodecResult<WireValue> {
    match value {
        Value::String(s) => Uuid::parse_str(s)
            .map(WireValue::Uuid)
            .map_err(|e| EncodeError::new(field, format!("'{}' is not a valid identifier: {}", s, e))),
        other => Err(mismatch(field, "identifier", other)),
    }
}

fn encode_timestamp(field: &str, value: &Value) -> CodecResult<WireValue> {
    let millis = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                normalize_epoch_millis(i)
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                let whole = f.trunc().abs() as u64;
                if digit_count(whole) == EPOCH_SECONDS_DIGITS {
                    (f * 1000.0).round() as i64
                } else {
                    f.round() as i64
                }
            } else {
                return Err(EncodeError::new(field, "timestamp is out of range"));
            }
        }
        Value::String(s) => match s.parse::<i64>() {
            Ok(i) => normalize_epoch_millis(i),
            Err(_) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc).timestamp_millis())
                .map_err(|e| {
                    EncodeError::new(field, format!("'{}' is not an RFC 3339 timestamp: {}", s, e))
                })?,
        },
        other => return Err(mismatch(field, "timestamp", other)),
    };

    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(WireValue::Timestamp)
        .ok_or_else(|| EncodeError::new(field, format!("timestamp {} is out of range", millis)))
}

fn encode_number(n: &Number) -> WireValue {
    match n.as_i64() {
        Some(i) => WireValue::Int(i),
        None => WireValue::Double(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn mismatch(field: &str, expected: &str, value: &Value) -> EncodeError {
    EncodeError::new(field, format!("expected {}, got {}", expected, value))
}
