//! In-memory driver
//!
//! Interprets the statement subset the template format uses, with the column
//! store's write semantics:
//! - INSERT and UPDATE are upserts; either creates a missing row
//! - binding NULL removes the column from the row
//! - DELETE acknowledges whether or not the row existed
//!
//! Supported statements:
//! - `INSERT INTO t (a, b) VALUES (?, ?)`
//! - `UPDATE t SET a = ?, b = ? WHERE <key> = ?`
//! - `SELECT * FROM t [WHERE a = ? AND b = ?] [ALLOW FILTERING]`
//! - `DELETE FROM t WHERE <key> = ?`
//!
//! Also counts prepares and executions, records executed statement text and
//! can fail any statement containing a configured fragment.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use crate::codec::{Row, WireValue};
use crate::schema::ID_FIELD;

use super::errors::{DriverError, DriverResult};
use super::{Driver, ExecResult, ExecuteOptions, PagingState, RowSet, StatementHandle};

const INSERT_PATTERN: &str =
    r"(?is)^INSERT\s+INTO\s+(\w+)\s*\(([^)]*)\)\s*VALUES\s*\(([^)]*)\)\s*;?$";
const UPDATE_PATTERN: &str = r"(?is)^UPDATE\s+(\w+)\s+SET\s+(.+?)\s+WHERE\s+(.+?)\s*;?$";
const SELECT_PATTERN: &str =
    r"(?is)^SELECT\s+\*\s+FROM\s+(\w+)(?:\s+WHERE\s+(.+?))?(\s+ALLOW\s+FILTERING)?\s*;?$";
const DELETE_PATTERN: &str = r"(?is)^DELETE\s+FROM\s+(\w+)\s+WHERE\s+(.+?)\s*;?$";
const BIND_PATTERN: &str = r"^(\w+)\s*=\s*\?$";
const AND_PATTERN: &str = r"(?i)\s+AND\s+";

type Table = BTreeMap<String, Row>;

#[derive(Debug, Clone)]
enum Command {
    Insert {
        table: String,
        columns: Vec<String>,
    },
    Update {
        table: String,
        assignments: Vec<String>,
        filter: Vec<String>,
    },
    Select {
        table: String,
        filter: Vec<String>,
    },
    Delete {
        table: String,
        filter: Vec<String>,
    },
}

impl Command {
    fn bind_count(&self) -> usize {
        match self {
            Command::Insert { columns, .. } => columns.len(),
            Command::Update {
                assignments,
                filter,
                ..
            } => assignments.len() + filter.len(),
            Command::Select { filter, .. } | Command::Delete { filter, .. } => filter.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct PreparedCommand {
    query: String,
    command: Command,
}

/// Column-store emulation backed by process memory.
pub struct MemoryDriver {
    /// Partition key column shared by every table
    key_column: String,
    statements: RwLock<HashMap<u64, PreparedCommand>>,
    next_handle: AtomicU64,
    tables: RwLock<HashMap<String, Table>>,
    prepare_count: AtomicUsize,
    execute_count: AtomicUsize,
    executed: Mutex<Vec<String>>,
    failing_fragments: RwLock<Vec<String>>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Creates a driver whose tables are keyed by `id`
    pub fn new() -> Self {
        Self::with_key_column(ID_FIELD)
    }

    pub fn with_key_column(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            statements: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            tables: RwLock::new(HashMap::new()),
            prepare_count: AtomicUsize::new(0),
            execute_count: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
            failing_fragments: RwLock::new(Vec::new()),
        }
    }

    /// Number of successful prepare calls
    pub fn prepare_count(&self) -> usize {
        self.prepare_count.load(Ordering::SeqCst)
    }

    /// Number of execute calls that reached a statement
    pub fn execute_count(&self) -> usize {
        self.execute_count.load(Ordering::SeqCst)
    }

    /// Text of every executed statement, in call order
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Makes every prepare or execute of a statement containing `fragment` fail
    pub fn fail_statements_containing(&self, fragment: impl Into<String>) {
        if let Ok(mut fragments) = self.failing_fragments.write() {
            fragments.push(fragment.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut fragments) = self.failing_fragments.write() {
            fragments.clear();
        }
    }

    /// Rows currently stored in `table`, in key order
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).map(|t| t.values().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    fn check_injected_failure(&self, query: &str) -> DriverResult<()> {
        let fragments = self
            .failing_fragments
            .read()
            .map_err(|_| DriverError::Unavailable("failure registry poisoned".into()))?;
        match fragments.iter().find(|f| query.contains(f.as_str())) {
            Some(fragment) => Err(DriverError::Unavailable(format!(
                "injected failure for statements containing '{}'",
                fragment
            ))),
            None => Ok(()),
        }
    }

    fn parse(&self, query: &str) -> DriverResult<Command> {
        let syntax = |reason: String| DriverError::Syntax {
            query: query.to_string(),
            reason,
        };
        let regex = |pattern: &str| Regex::new(pattern).map_err(|e| syntax(e.to_string()));
        let text = query.trim();

        if let Some(caps) = regex(INSERT_PATTERN)?.captures(text) {
            let columns = split_list(&caps[2]);
            let values = split_list(&caps[3]);
            if columns.is_empty() || columns.len() != values.len() {
                return Err(syntax("column and value counts differ".into()));
            }
            if values.iter().any(|v| v != "?") {
                return Err(syntax("only positional markers are supported in VALUES".into()));
            }
            if !columns.iter().any(|c| c == &self.key_column) {
                return Err(syntax(format!("INSERT must bind key column '{}'", self.key_column)));
            }
            return Ok(Command::Insert {
                table: caps[1].to_string(),
                columns,
            });
        }

        if let Some(caps) = regex(UPDATE_PATTERN)?.captures(text) {
            let bind = regex(BIND_PATTERN)?;
            let assignments = split_list(&caps[2])
                .iter()
                .map(|a| bound_column(&bind, a))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| syntax("SET accepts only 'column = ?' assignments".into()))?;
            let filter = self.key_filter(&caps[3], &regex(AND_PATTERN)?, &bind, &syntax)?;
            return Ok(Command::Update {
                table: caps[1].to_string(),
                assignments,
                filter,
            });
        }

        if let Some(caps) = regex(SELECT_PATTERN)?.captures(text) {
            let filter = match caps.get(2) {
                Some(clause) => {
                    parse_conditions(clause.as_str(), &regex(AND_PATTERN)?, &regex(BIND_PATTERN)?)
                        .ok_or_else(|| syntax("WHERE accepts only 'column = ?' conditions".into()))?
                }
                None => Vec::new(),
            };
            return Ok(Command::Select {
                table: caps[1].to_string(),
                filter,
            });
        }

        if let Some(caps) = regex(DELETE_PATTERN)?.captures(text) {
            let filter =
                self.key_filter(&caps[2], &regex(AND_PATTERN)?, &regex(BIND_PATTERN)?, &syntax)?;
            return Ok(Command::Delete {
                table: caps[1].to_string(),
                filter,
            });
        }

        Err(syntax("unsupported statement".into()))
    }

    /// Mutations must address exactly one row by key.
    fn key_filter(
        &self,
        clause: &str,
        and: &Regex,
        bind: &Regex,
        syntax: &dyn Fn(String) -> DriverError,
    ) -> DriverResult<Vec<String>> {
        let filter = parse_conditions(clause, and, bind)
            .ok_or_else(|| syntax("WHERE accepts only 'column = ?' conditions".into()))?;
        if filter != [self.key_column.clone()] {
            return Err(syntax(format!(
                "mutations must restrict exactly the key column '{}'",
                self.key_column
            )));
        }
        Ok(filter)
    }

    fn key_of(&self, value: &WireValue) -> DriverResult<String> {
        if value.is_null() {
            return Err(DriverError::InvalidRequest(format!(
                "key column '{}' must not be null",
                self.key_column
            )));
        }
        Ok(value.to_string())
    }

    fn upsert(&self, table: &str, key: String, assignments: Vec<(String, WireValue)>) -> DriverResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DriverError::Execution("table lock poisoned".into()))?;
        let row = tables
            .entry(table.to_string())
            .or_default()
            .entry(key)
            .or_default();
        for (column, value) in assignments {
            if value.is_null() {
                row.remove(&column);
            } else {
                row.insert(column, value);
            }
        }
        Ok(())
    }

    fn select(
        &self,
        table: &str,
        filter: &[String],
        values: &[WireValue],
        options: &ExecuteOptions,
    ) -> DriverResult<RowSet> {
        if values.iter().any(WireValue::is_null) {
            return Err(DriverError::InvalidRequest(
                "NULL is not allowed in a WHERE restriction".into(),
            ));
        }

        let tables = self
            .tables
            .read()
            .map_err(|_| DriverError::Execution("table lock poisoned".into()))?;
        let matching: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.values()
                    .filter(|row| {
                        filter
                            .iter()
                            .zip(values)
                            .all(|(column, value)| row.get(column) == Some(value))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let offset = match &options.paging_state {
            Some(state) => decode_offset(state)?,
            None => 0,
        };

        match options.page_size.filter(|size| *size > 0) {
            Some(size) => {
                let end = offset.saturating_add(size).min(matching.len());
                let page = matching
                    .get(offset.min(matching.len())..end)
                    .map(<[Row]>::to_vec)
                    .unwrap_or_default();
                let next = (end < matching.len()).then(|| encode_offset(end));
                Ok(RowSet::new(page, next))
            }
            None => Ok(RowSet::new(
                matching.into_iter().skip(offset).collect(),
                None,
            )),
        }
    }
}

impl Driver for MemoryDriver {
    fn prepare(&self, query: &str) -> DriverResult<StatementHandle> {
        self.check_injected_failure(query)?;
        let command = self.parse(query)?;

        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.statements
            .write()
            .map_err(|_| DriverError::Execution("statement registry poisoned".into()))?
            .insert(
                id,
                PreparedCommand {
                    query: query.to_string(),
                    command,
                },
            );
        self.prepare_count.fetch_add(1, Ordering::SeqCst);

        Ok(StatementHandle::new(id))
    }

    fn execute(
        &self,
        handle: StatementHandle,
        values: &[WireValue],
        options: &ExecuteOptions,
    ) -> DriverResult<ExecResult> {
        let prepared = self
            .statements
            .read()
            .map_err(|_| DriverError::Execution("statement registry poisoned".into()))?
            .get(&handle.id())
            .cloned()
            .ok_or(DriverError::UnknownStatement(handle.id()))?;

        self.check_injected_failure(&prepared.query)?;
        self.execute_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(prepared.query.clone());
        }

        let expected = prepared.command.bind_count();
        if values.len() != expected {
            return Err(DriverError::InvalidRequest(format!(
                "expected {} bound values, got {}",
                expected,
                values.len()
            )));
        }

        match prepared.command {
            Command::Insert { table, columns } => {
                let assignments: Vec<(String, WireValue)> =
                    columns.into_iter().zip(values.iter().cloned()).collect();
                let key_value = assignments
                    .iter()
                    .find(|(c, _)| c == &self.key_column)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(WireValue::Null);
                let key = self.key_of(&key_value)?;
                self.upsert(&table, key, assignments)?;
                Ok(ExecResult::Ack(true))
            }
            Command::Update {
                table,
                assignments,
                ..
            } => {
                let key_value = &values[assignments.len()];
                let key = self.key_of(key_value)?;
                let mut bound: Vec<(String, WireValue)> =
                    assignments.into_iter().zip(values.iter().cloned()).collect();
                bound.push((self.key_column.clone(), key_value.clone()));
                self.upsert(&table, key, bound)?;
                Ok(ExecResult::Ack(true))
            }
            Command::Delete { table, .. } => {
                let key = self.key_of(&values[0])?;
                let mut tables = self
                    .tables
                    .write()
                    .map_err(|_| DriverError::Execution("table lock poisoned".into()))?;
                if let Some(rows) = tables.get_mut(&table) {
                    rows.remove(&key);
                }
                Ok(ExecResult::Ack(true))
            }
            Command::Select { table, filter } => {
                let rows = self.select(&table, &filter, values, options)?;
                Ok(ExecResult::Rows(rows))
            }
        }
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn bound_column(bind: &Regex, text: &str) -> Option<String> {
    bind.captures(text.trim()).map(|caps| caps[1].to_string())
}

fn parse_conditions(clause: &str, and: &Regex, bind: &Regex) -> Option<Vec<String>> {
    and.split(clause.trim())
        .map(|condition| bound_column(bind, condition))
        .collect()
}

fn encode_offset(offset: usize) -> PagingState {
    PagingState::new((offset as u64).to_be_bytes().to_vec())
}

fn decode_offset(state: &PagingState) -> DriverResult<usize> {
    let bytes: [u8; 8] = state
        .as_bytes()
        .try_into()
        .map_err(|_| DriverError::InvalidRequest("malformed paging state".into()))?;
    Ok(u64::from_be_bytes(bytes) as usize)
}
