//! Statement compiler
//!
//! Prepares every leaf of a template tree once at startup, preserving the
//! group hierarchy, and prepares predicate statements on demand.
//!
//! Any prepare failure during `compile_all` is returned to the caller, which
//! must not serve traffic with a partially prepared tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::driver::{Driver, StatementHandle};
use crate::observability::{log_event_with_fields, DaoMetrics, Event};
use crate::schema::Schema;

use super::cache::{CacheOutcome, StatementCache};
use super::errors::{StatementError, StatementResult};
use super::template::{join_path, StatementTemplate, TemplateNode};

/// Path reported for statements generated from a predicate
const DYNAMIC_PATH: &str = "<dynamic>";

/// Caveat the store requires before it will scan unindexed columns
const ALLOW_FILTERING: &str = "ALLOW FILTERING";

/// A compiled statement. Immutable and shared by all callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub handle: StatementHandle,
    /// Resolved query text the handle was prepared from
    pub query: String,
    /// Field names in positional binding order
    pub params: Vec<String>,
}

impl PreparedStatement {
    pub fn new(handle: StatementHandle, query: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            handle,
            query: query.into(),
            params,
        }
    }
}

/// Compiled counterpart of a template tree.
#[derive(Debug, Clone)]
pub enum StatementNode {
    Leaf(Arc<PreparedStatement>),
    Group(BTreeMap<String, StatementNode>),
}

impl StatementNode {
    /// Resolves a dotted path to a node
    pub fn get(&self, path: &str) -> Option<&StatementNode> {
        path.split('.').try_fold(self, |node, segment| match node {
            StatementNode::Group(children) => children.get(segment),
            StatementNode::Leaf(_) => None,
        })
    }

    /// Resolves a dotted path to a compiled leaf
    pub fn leaf(&self, path: &str) -> Option<&Arc<PreparedStatement>> {
        match self.get(path)? {
            StatementNode::Leaf(statement) => Some(statement),
            StatementNode::Group(_) => None,
        }
    }

    /// All leaves with their dotted paths, depth-first in name order
    pub fn leaves(&self) -> Vec<(String, Arc<PreparedStatement>)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect(&self, prefix: &str, out: &mut Vec<(String, Arc<PreparedStatement>)>) {
        match self {
            StatementNode::Leaf(statement) => out.push((prefix.to_string(), Arc::clone(statement))),
            StatementNode::Group(children) => {
                for (name, child) in children {
                    child.collect(&join_path(prefix, name), out);
                }
            }
        }
    }
}

/// Prepares template trees and predicate statements against one driver.
pub struct StatementCompiler {
    driver: Arc<dyn Driver>,
    cache: StatementCache,
    allow_filtering: bool,
    metrics: Arc<DaoMetrics>,
}

impl StatementCompiler {
    pub fn new(driver: Arc<dyn Driver>, metrics: Arc<DaoMetrics>) -> Self {
        Self {
            driver,
            cache: StatementCache::new(),
            allow_filtering: true,
            metrics,
        }
    }

    /// Whether predicate statements carry the unindexed-scan caveat
    pub fn with_allow_filtering(mut self, allow_filtering: bool) -> Self {
        self.allow_filtering = allow_filtering;
        self
    }

    /// Prepares every leaf of `templates`, recursively.
    ///
    /// Leaves render with an empty predicate. Compiled leaves are cached by
    /// their text, so identical texts share one handle and a later
    /// predicate-free lookup reuses it.
    pub fn compile_all(&self, templates: &TemplateNode) -> StatementResult<StatementNode> {
        self.compile_node("", templates)
    }

    fn compile_node(&self, path: &str, node: &TemplateNode) -> StatementResult<StatementNode> {
        match node {
            TemplateNode::Leaf(template) => {
                let query = template.render("");
                let (statement, _) = self.prepare_cached(path, &query, template.params.clone())?;
                Ok(StatementNode::Leaf(rebind(statement, &template.params)))
            }
            TemplateNode::Group(children) => children
                .iter()
                .map(|(name, child)| {
                    self.compile_node(&join_path(path, name), child)
                        .map(|compiled| (name.clone(), compiled))
                })
                .collect::<StatementResult<BTreeMap<_, _>>>()
                .map(StatementNode::Group),
        }
    }

    /// Resolves `base` restricted by equality on `fields`.
    ///
    /// Only queryable fields and the identifier may appear; anything else is
    /// rejected before the driver is contacted. An empty field set resolves to
    /// the unrestricted base statement.
    pub fn resolve_dynamic(
        &self,
        base: &StatementTemplate,
        schema: &Schema,
        fields: &[&str],
    ) -> StatementResult<Arc<PreparedStatement>> {
        let mut fields: Vec<&str> = fields.to_vec();
        fields.sort_unstable();
        fields.dedup();

        let rejected: Vec<String> = fields
            .iter()
            .filter(|f| !schema.is_queryable(f))
            .map(|f| f.to_string())
            .collect();
        if !rejected.is_empty() {
            return Err(StatementError::NotQueryable(rejected));
        }

        let query = base.render(&self.predicate_text(&fields));
        let params: Vec<String> = base
            .params
            .iter()
            .cloned()
            .chain(fields.iter().map(|f| f.to_string()))
            .collect();

        let (statement, outcome) = self.prepare_cached(DYNAMIC_PATH, &query, params.clone())?;
        match outcome {
            CacheOutcome::Hit => self.metrics.increment_dynamic_cache_hits(),
            CacheOutcome::Miss => {
                self.metrics.increment_dynamic_cache_misses();
                log_event_with_fields(Event::DynamicStatementPrepared, &[("query", query.as_str())]);
            }
        }
        Ok(rebind(statement, &params))
    }

    /// Predicate clause for the given (sorted) fields
    pub fn predicate_text(&self, fields: &[&str]) -> String {
        if fields.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = fields.iter().map(|f| format!("{} = ?", f)).collect();
        let mut text = format!("WHERE {}", conditions.join(" AND "));
        if self.allow_filtering {
            text.push(' ');
            text.push_str(ALLOW_FILTERING);
        }
        text
    }

    /// Number of distinct statements prepared so far
    pub fn cached_statements(&self) -> usize {
        self.cache.len()
    }

    fn prepare_cached(
        &self,
        path: &str,
        query: &str,
        params: Vec<String>,
    ) -> StatementResult<(Arc<PreparedStatement>, CacheOutcome)> {
        self.cache.get_or_prepare(query, || {
            let handle = self.driver.prepare(query).map_err(|source| {
                log_event_with_fields(
                    Event::StatementPrepareFailed,
                    &[("path", path), ("query", query), ("reason", source.to_string().as_str())],
                );
                StatementError::Prepare {
                    path: path.to_string(),
                    query: query.to_string(),
                    source,
                }
            })?;
            self.metrics.increment_statements_prepared();
            log_event_with_fields(Event::StatementPrepared, &[("path", path), ("query", query)]);
            Ok(PreparedStatement::new(handle, query, params))
        })
    }
}

/// Shares a cached handle under a different binding order when two
/// templates render to the same text but bind different fields.
fn rebind(statement: Arc<PreparedStatement>, params: &[String]) -> Arc<PreparedStatement> {
    if statement.params == params {
        statement
    } else {
        Arc::new(PreparedStatement::new(
            statement.handle,
            statement.query.clone(),
            params.to_vec(),
        ))
    }
}
