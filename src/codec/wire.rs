//! Store wire representation
//!
//! The typed values a prepared statement binds and a row returns. `Null` is
//! the store's explicit NULL marker: binding it clears the column.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(String),
    Int(i64),
    Double(f64),
    Boolean(bool),
}

impl WireValue {
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// Store type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Uuid(_) => "uuid",
            WireValue::Timestamp(_) => "timestamp",
            WireValue::Text(_) => "text",
            WireValue::Int(_) => "bigint",
            WireValue::Double(_) => "double",
            WireValue::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Null => write!(f, "NULL"),
            WireValue::Uuid(u) => write!(f, "{}", u),
            WireValue::Timestamp(t) => write!(f, "{}", t.timestamp_millis()),
            WireValue::Text(s) => write!(f, "'{}'", s),
            WireValue::Int(i) => write!(f, "{}", i),
            WireValue::Double(d) => write!(f, "{}", d),
            WireValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One result row: column name -> value
pub type Row = BTreeMap<String, WireValue>;
