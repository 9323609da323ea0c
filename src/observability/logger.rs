//! Structured JSON line logger
//!
//! Each call writes exactly one line: `event` first, then `severity`, then
//! the caller's fields ordered by key. Output is synchronous and unbuffered.
//! Lines below the process-wide minimum severity are dropped before any
//! formatting happens.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

const SEVERITY_NAMES: [&str; 5] = ["TRACE", "INFO", "WARN", "ERROR", "FATAL"];

/// Log severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-statement detail
    Trace = 0,
    /// Lifecycle
    Info = 1,
    /// Rejected requests
    Warn = 2,
    /// Failed operations
    Error = 3,
    /// DAO cannot start
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        SEVERITY_NAMES[*self as usize]
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Accumulates one JSON object as `"key":"value"` pairs in insertion order.
struct LogLine {
    buf: String,
}

impl LogLine {
    fn new() -> Self {
        Self {
            buf: String::from("{"),
        }
    }

    fn pair(mut self, key: &str, value: &str) -> Self {
        if self.buf.len() > 1 {
            self.buf.push(',');
        }
        push_quoted(&mut self.buf, key);
        self.buf.push(':');
        push_quoted(&mut self.buf, value);
        self
    }

    fn finish(mut self) -> String {
        self.buf.push_str("}\n");
        self.buf
    }
}

fn push_quoted(buf: &mut String, raw: &str) {
    match serde_json::to_string(raw) {
        Ok(quoted) => buf.push_str(&quoted),
        // Serializing a str cannot fail; keep the line well-formed regardless.
        Err(_) => buf.push_str("\"\""),
    }
}

fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut ordered: Vec<&(&str, &str)> = fields.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));

    ordered
        .into_iter()
        .fold(
            LogLine::new()
                .pair("event", event)
                .pair("severity", severity.as_str()),
            |line, (key, value)| line.pair(key, value),
        )
        .finish()
}

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes `event` if `severity` passes the filter. `Error` and `Fatal`
    /// go to stderr, everything else to stdout.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = render(severity, event, fields);
        if severity >= Severity::Error {
            emit(&mut io::stderr().lock(), &line);
        } else {
            emit(&mut io::stdout().lock(), &line);
        }
    }
}

fn emit<W: Write>(sink: &mut W, line: &str) {
    // Logging never fails the caller.
    let _ = sink.write_all(line.as_bytes());
    let _ = sink.flush();
}
