//! Include trees and their schema-checked plans.
//!
//! An [`IncludeTree`] is what the caller asked for: relationship names
//! arranged as paths, siblings in the order they were requested. An
//! [`IncludePlan`] is the same tree checked against a [`Schema`] for one
//! root type, with every hop resolved to its relationship slot and target
//! type. Traversal only ever sees plans.

use std::fmt;

use tracing::warn;

use crate::error::ConfigError;
use crate::schema::Schema;
use crate::types::{Cardinality, TypeHandle};

/// One hop in an include tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeNode {
    pub name: String,
    pub children: Vec<IncludeNode>,
}

impl IncludeNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append a child hop.
    pub fn child(mut self, child: IncludeNode) -> Self {
        self.children.push(child);
        self
    }

    fn insert(&mut self, segments: &[&str]) {
        if let Some((first, rest)) = segments.split_first() {
            insert_into(&mut self.children, first, rest);
        }
    }

    fn write_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };
        if self.children.is_empty() {
            out.push(path);
        } else {
            for child in &self.children {
                child.write_paths(&path, out);
            }
        }
    }
}

fn insert_into(siblings: &mut Vec<IncludeNode>, name: &str, rest: &[&str]) {
    let index = match siblings.iter().position(|n| n.name == name) {
        Some(index) => index,
        None => {
            siblings.push(IncludeNode::new(name));
            siblings.len() - 1
        }
    };
    siblings[index].insert(rest);
}

/// Forest of include paths. Empty means "include nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    pub roots: Vec<IncludeNode>,
}

impl IncludeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level branch.
    pub fn branch(mut self, node: IncludeNode) -> Self {
        self.roots.push(node);
        self
    }

    /// Parse an include parameter such as `"author.blogs,reviewer"`.
    ///
    /// Paths sharing a prefix merge into one branch. The first occurrence of
    /// a name fixes its position among its siblings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyIncludeSegment` for empty path segments.
    pub fn parse(include: &str) -> Result<Self, ConfigError> {
        let mut tree = IncludeTree::new();
        if include.trim().is_empty() {
            return Ok(tree);
        }
        for path in include.split(',') {
            let segments: Vec<&str> = path.split('.').map(str::trim).collect();
            if segments.iter().any(|s| s.is_empty()) {
                return Err(ConfigError::EmptyIncludeSegment {
                    include: include.to_string(),
                });
            }
            tree.insert_path(&segments);
        }
        Ok(tree)
    }

    /// Merge one dotted path, given as segments, into the tree.
    pub fn insert_path(&mut self, segments: &[&str]) {
        if let Some((first, rest)) = segments.split_first() {
            insert_into(&mut self.roots, first, rest);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Leaf paths in tree order, dot-separated.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.write_paths("", &mut out);
        }
        out
    }
}

impl fmt::Display for IncludeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paths().join(","))
    }
}

/// Identifier of a node within one [`IncludePlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanNodeId(usize);

/// A resolved hop: which slot to read and what it leads to.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub id: PlanNodeId,
    pub relationship: String,
    pub slot: usize,
    pub cardinality: Cardinality,
    pub owner: TypeHandle,
    pub target: TypeHandle,
    /// Dotted path from the root type, e.g. `author.blogs`.
    pub path: String,
    pub children: Vec<PlanNodeId>,
}

/// An include tree validated against the schema for one root type.
#[derive(Debug, Clone)]
pub struct IncludePlan {
    root_type: TypeHandle,
    nodes: Vec<PlanNode>,
    roots: Vec<PlanNodeId>,
}

impl IncludePlan {
    /// Check every hop of `tree` against `schema`, starting at `root_type`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownRelationship` for the first hop that is not
    /// declared on the type reached at that point.
    pub fn resolve(
        schema: &Schema,
        root_type: TypeHandle,
        tree: &IncludeTree,
    ) -> Result<Self, ConfigError> {
        schema.resource_type(root_type)?;
        let mut plan = IncludePlan {
            root_type,
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        for node in &tree.roots {
            let id = plan.resolve_node(schema, root_type, node, "")?;
            plan.roots.push(id);
        }
        Ok(plan)
    }

    pub fn root_type(&self) -> TypeHandle {
        self.root_type
    }

    /// Top-level branches in requested order.
    pub fn roots(&self) -> &[PlanNodeId] {
        &self.roots
    }

    pub fn node(&self, id: PlanNodeId) -> &PlanNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn resolve_node(
        &mut self,
        schema: &Schema,
        owner: TypeHandle,
        node: &IncludeNode,
        prefix: &str,
    ) -> Result<PlanNodeId, ConfigError> {
        let owner_type = schema.resource_type(owner)?;
        let descriptor = owner_type.require_relationship(&node.name).map_err(|e| {
            warn!(
                type_name = owner_type.name(),
                relationship = %node.name,
                "include path rejected"
            );
            e
        })?;
        let path = if prefix.is_empty() {
            node.name.clone()
        } else {
            format!("{}.{}", prefix, node.name)
        };

        let id = PlanNodeId(self.nodes.len());
        self.nodes.push(PlanNode {
            id,
            relationship: descriptor.name.clone(),
            slot: descriptor.slot,
            cardinality: descriptor.cardinality,
            owner,
            target: descriptor.target,
            path: path.clone(),
            children: Vec::new(),
        });

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            children.push(self.resolve_node(schema, descriptor.target, child, &path)?);
        }
        self.nodes[id.0].children = children;
        Ok(id)
    }
}
