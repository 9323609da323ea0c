//! Database driver contract
//!
//! The DAO consumes the store only through `prepare` and `execute`. Connection
//! pooling, wire protocol, transport retries and timeouts belong to the
//! implementation behind this trait.

mod errors;
mod memory;

pub use errors::{DriverError, DriverResult};
pub use memory::MemoryDriver;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::codec::{Row, WireValue};

/// Opaque handle to a statement compiled by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementHandle(u64);

impl StatementHandle {
    /// For driver implementations only
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Opaque continuation token for a truncated scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PagingState(Vec<u8>);

impl PagingState {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Text form for handing the token to remote callers
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(text: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(text).map(Self)
    }
}

/// Per-call execution options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Maximum rows per page; `None` returns every row
    pub page_size: Option<usize>,
    /// Resume point from a previous page
    pub paging_state: Option<PagingState>,
}

impl ExecuteOptions {
    pub fn paged(page_size: usize, paging_state: Option<PagingState>) -> Self {
        Self {
            page_size: Some(page_size),
            paging_state,
        }
    }
}

/// Rows returned by a query, plus a token when more remain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
    pub paging_state: Option<PagingState>,
}

impl RowSet {
    pub fn new(rows: Vec<Row>, paging_state: Option<PagingState>) -> Self {
        Self { rows, paging_state }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of executing a statement
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    /// Row-returning statement
    Rows(RowSet),
    /// Statement without row semantics; the flag is the store's acknowledgment
    Ack(bool),
}

impl ExecResult {
    /// Rows of a query result; an acknowledgment yields an empty set
    pub fn into_rows(self) -> RowSet {
        match self {
            ExecResult::Rows(rows) => rows,
            ExecResult::Ack(_) => RowSet::default(),
        }
    }

    /// Acknowledgment of a mutation; a row result counts as acknowledged
    pub fn acknowledged(&self) -> bool {
        match self {
            ExecResult::Ack(ack) => *ack,
            ExecResult::Rows(_) => true,
        }
    }
}

/// Narrow contract with the database client.
///
/// Implementations must be safe to call from many threads at once.
pub trait Driver: Send + Sync {
    /// Compiles a query and returns a reusable handle.
    fn prepare(&self, query: &str) -> DriverResult<StatementHandle>;

    /// Executes a prepared statement with positional values.
    fn execute(
        &self,
        handle: StatementHandle,
        values: &[WireValue],
        options: &ExecuteOptions,
    ) -> DriverResult<ExecResult>;
}
