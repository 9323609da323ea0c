//! JSON output for the CLI
//!
//! One JSON object per line on stdout, UTF-8 only.

use std::io::Write;

use serde_json::{json, Value};

use super::errors::CliResult;

/// Write one JSON line to `writer`
pub fn write_line<W: Write>(writer: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write an error line; `fields` carries per-field messages when present
pub fn error_line(code: &str, message: &str, fields: Option<&Value>) -> Value {
    let mut line = json!({
        "status": "error",
        "code": code,
        "message": message,
    });
    if let Some(fields) = fields {
        line["fields"] = fields.clone();
    }
    line
}
