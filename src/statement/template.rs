//! Declarative statement templates
//!
//! A template tree is a set of named leaves (`query` + `params`) and named
//! groups of further nodes, nested arbitrarily. Leaves are addressed by dotted
//! paths such as `__unique.email`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Substitution point for an optional dynamic predicate
pub const PREDICATE_SLOT: &str = "%s";

/// Group holding one uniqueness lookup per unique field
pub const UNIQUE_GROUP: &str = "__unique";

/// Group holding one existence lookup per referencing field
pub const EXISTS_GROUP: &str = "__exists";

pub const INSERT: &str = "insert";
pub const UPDATE: &str = "update";
pub const SELECT_ONE: &str = "select_one";
pub const SELECT: &str = "select";
pub const DELETE: &str = "delete";

/// Statements every entity kind must declare as leaves
pub const CORE_STATEMENTS: [&str; 5] = [INSERT, UPDATE, SELECT_ONE, SELECT, DELETE];

/// A single parameterized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatementTemplate {
    /// Query text; may contain one `%s` predicate slot
    pub query: String,
    /// Field names in positional binding order
    #[serde(default)]
    pub params: Vec<String>,
}

impl StatementTemplate {
    pub fn new(query: impl Into<String>, params: &[&str]) -> Self {
        Self {
            query: query.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Substitutes `predicate` into the slot.
    ///
    /// Only whitespace adjacent to the slot is adjusted; the rest of the
    /// query text, quoted literals included, is kept as written. Templates
    /// without a slot render to their trimmed query text.
    pub fn render(&self, predicate: &str) -> String {
        let Some((head, tail)) = self.query.split_once(PREDICATE_SLOT) else {
            return self.query.trim().to_string();
        };
        [head.trim(), predicate.trim(), tail.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of predicate slots in the query
    pub fn slot_count(&self) -> usize {
        self.query.matches(PREDICATE_SLOT).count()
    }
}

/// A node of the template tree: a leaf template or a named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateNode {
    Leaf(StatementTemplate),
    Group(BTreeMap<String, TemplateNode>),
}

impl TemplateNode {
    /// Resolves a dotted path to a node
    pub fn get(&self, path: &str) -> Option<&TemplateNode> {
        path.split('.').try_fold(self, |node, segment| match node {
            TemplateNode::Group(children) => children.get(segment),
            TemplateNode::Leaf(_) => None,
        })
    }

    /// Resolves a dotted path to a leaf template
    pub fn leaf(&self, path: &str) -> Option<&StatementTemplate> {
        match self.get(path)? {
            TemplateNode::Leaf(template) => Some(template),
            TemplateNode::Group(_) => None,
        }
    }

    /// All leaves with their dotted paths, depth-first in name order
    pub fn leaves(&self) -> Vec<(String, &StatementTemplate)> {
        let mut out = Vec::new();
        collect_leaves(self, "", &mut out);
        out
    }
}

fn collect_leaves<'a>(
    node: &'a TemplateNode,
    prefix: &str,
    out: &mut Vec<(String, &'a StatementTemplate)>,
) {
    match node {
        TemplateNode::Leaf(template) => out.push((prefix.to_string(), template)),
        TemplateNode::Group(children) => {
            for (name, child) in children {
                collect_leaves(child, &join_path(prefix, name), out);
            }
        }
    }
}

/// Joins a group path and a child name with a dot
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> TemplateNode {
        serde_json::from_value(json!({
            "select": { "query": "SELECT * FROM users %s", "params": [] },
            "select_one": { "query": "SELECT * FROM users WHERE id = ?", "params": ["id"] },
            "__unique": {
                "email": { "query": "SELECT * FROM users WHERE email = ?", "params": ["email"] },
                "nested": {
                    "handle": { "query": "SELECT * FROM users WHERE handle = ?", "params": ["handle"] }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_leaf_and_group_are_distinguished() {
        let tree = tree();
        assert!(matches!(tree.get("select"), Some(TemplateNode::Leaf(_))));
        assert!(matches!(tree.get("__unique"), Some(TemplateNode::Group(_))));
        assert!(tree.leaf("__unique").is_none());
    }

    #[test]
    fn test_dotted_paths_reach_nested_leaves() {
        let tree = tree();
        let handle = tree.leaf("__unique.nested.handle").unwrap();
        assert_eq!(handle.params, vec!["handle"]);
        assert!(tree.get("select.query").is_none());
        assert!(tree.get("missing").is_none());
    }

    #[test]
    fn test_leaves_are_listed_depth_first() {
        let paths: Vec<String> = tree().leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![
                "__unique.email",
                "__unique.nested.handle",
                "select",
                "select_one"
            ]
        );
    }

    #[test]
    fn test_render_fills_slot() {
        let template = StatementTemplate::new("SELECT * FROM users %s", &[]);
        assert_eq!(template.render(""), "SELECT * FROM users");
        assert_eq!(
            template.render("WHERE email = ? ALLOW FILTERING"),
            "SELECT * FROM users WHERE email = ? ALLOW FILTERING"
        );
        assert_eq!(template.slot_count(), 1);
    }

    #[test]
    fn test_render_keeps_literal_whitespace() {
        let template = StatementTemplate::new("SELECT * FROM users WHERE note = 'a  b' %s", &[]);
        assert_eq!(
            template.render("AND email = ?"),
            "SELECT * FROM users WHERE note = 'a  b' AND email = ?"
        );

        let plain = StatementTemplate::new("  DELETE FROM users  WHERE id = ?\n", &["id"]);
        assert_eq!(plain.render(""), "DELETE FROM users  WHERE id = ?");
        assert_eq!(plain.slot_count(), 0);
    }

    #[test]
    fn test_params_default_to_empty() {
        let template: StatementTemplate =
            serde_json::from_value(json!({ "query": "SELECT * FROM t %s" })).unwrap();
        assert!(template.params.is_empty());
    }
}
