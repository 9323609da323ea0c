//! Prepared statement cache
//!
//! Maps resolved query text to its prepared statement. Entries are never
//! removed or replaced, so the cache grows monotonically for the DAO's life.
//!
//! Hits take a shared read lock and do not block each other. A miss takes the
//! write lock, re-checks, and prepares while holding it, so concurrent misses
//! for the same text produce exactly one prepared handle.
//!
//! The write lock is held across the driver's prepare call. While a miss is
//! in flight, every other lookup on this cache, hits included, waits for that
//! round trip to finish. Static statements are prepared at startup, so only
//! the first use of each predicate shape pays this cost.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::compiler::PreparedStatement;
use super::errors::{StatementError, StatementResult};

/// Whether a lookup was served from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<String, Arc<PreparedStatement>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a statement by exact query text.
    pub fn get(&self, query: &str) -> StatementResult<Option<Arc<PreparedStatement>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StatementError::CachePoisoned)?;
        Ok(entries.get(query).cloned())
    }

    /// Returns the cached statement for `query`, preparing it on a miss.
    ///
    /// `prepare` runs at most once per distinct query text across all callers.
    pub fn get_or_prepare<F>(
        &self,
        query: &str,
        prepare: F,
    ) -> StatementResult<(Arc<PreparedStatement>, CacheOutcome)>
    where
        F: FnOnce() -> StatementResult<PreparedStatement>,
    {
        if let Some(statement) = self.get(query)? {
            return Ok((statement, CacheOutcome::Hit));
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|_| StatementError::CachePoisoned)?;

        // Another caller may have prepared it between the two locks.
        if let Some(statement) = entries.get(query) {
            return Ok((Arc::clone(statement), CacheOutcome::Hit));
        }

        let statement = Arc::new(prepare()?);
        entries.insert(query.to_string(), Arc::clone(&statement));
        Ok((statement, CacheOutcome::Miss))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
