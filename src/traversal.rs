//! Include traversal over a resource graph.
//!
//! Walks every root through every branch of its include plan, depth-first in
//! requested order, and records each logical resource the first time an
//! include path reaches it. Two sets bound the walk:
//!
//! - `included`: resource keys already recorded. A later path reaching the
//!   same key contributes linkage only, never a second entry.
//! - `visited`: `(resource key, plan node)` pairs already expanded. A pair is
//!   expanded at most once, so the walk is finite for any graph shape,
//!   cycles included.
//!
//! Roots are never recorded, even when a path cycles back to one.

use std::collections::HashSet;

use tracing::trace;

use crate::error::{ConfigError, DocumentError};
use crate::graph::{NodeRef, ResourceGraph};
use crate::include::{IncludePlan, PlanNodeId};
use crate::types::ResourceKey;

/// A resource reached through an include path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// The instance that was reached first. Later duplicates are not kept.
    pub node: NodeRef,
    pub key: ResourceKey,
    /// Dotted include path that reached it, e.g. `author.blogs`.
    pub path: String,
}

/// Result of one traversal.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Included resources in first-discovery order, roots excluded.
    pub included: Vec<Discovery>,
    /// Number of `(resource, plan node)` pairs expanded.
    pub expanded: usize,
    /// Number of expansions skipped because the pair was already expanded.
    pub skipped: usize,
}

impl Traversal {
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.included.iter().any(|d| &d.key == key)
    }
}

/// Walk `roots` through the plan matching each root's type.
///
/// `plans` must hold one plan per distinct root type. The graph is only read.
///
/// # Errors
///
/// Returns `ConfigError::MissingIncludePlan` if a root's type has no plan,
/// or a graph error if a node reference does not belong to `graph`.
pub fn traverse(
    graph: &ResourceGraph,
    roots: &[NodeRef],
    plans: &[IncludePlan],
) -> Result<Traversal, DocumentError> {
    let mut root_keys = HashSet::with_capacity(roots.len());
    for &root in roots {
        root_keys.insert(graph.key(root)?);
    }

    let mut walk = Walk {
        graph,
        plans,
        root_keys,
        included_keys: HashSet::new(),
        visited: HashSet::new(),
        result: Traversal::default(),
    };

    for &root in roots {
        let type_handle = graph.resource(root)?.type_handle();
        let plan_index = plans
            .iter()
            .position(|p| p.root_type() == type_handle)
            .ok_or_else(|| ConfigError::MissingIncludePlan {
                type_name: format!("#{}", type_handle.index()),
            })?;
        for &branch in plans[plan_index].roots() {
            walk.descend(root, plan_index, branch)?;
        }
    }

    Ok(walk.result)
}

struct Walk<'a> {
    graph: &'a ResourceGraph,
    plans: &'a [IncludePlan],
    root_keys: HashSet<ResourceKey>,
    included_keys: HashSet<ResourceKey>,
    visited: HashSet<(ResourceKey, usize, PlanNodeId)>,
    result: Traversal,
}

impl Walk<'_> {
    /// Expand one plan node from one resource.
    ///
    /// Recursion depth is bounded by the depth of the include plan.
    fn descend(
        &mut self,
        node: NodeRef,
        plan_index: usize,
        plan_node: PlanNodeId,
    ) -> Result<(), DocumentError> {
        let graph = self.graph;
        let plans = self.plans;
        let step = plans[plan_index].node(plan_node);
        let resource = graph.resource(node)?;

        if !self
            .visited
            .insert((resource.key(), plan_index, plan_node))
        {
            trace!(
                resource = %resource.identity(),
                path = %step.path,
                "already expanded, skipping"
            );
            self.result.skipped += 1;
            return Ok(());
        }
        self.result.expanded += 1;

        let targets = resource.related(step.slot).targets();

        for &target in targets {
            let key = graph.key(target)?;
            if self.root_keys.contains(&key) || self.included_keys.contains(&key) {
                continue;
            }
            trace!(identity = %key.identity, path = %step.path, "discovered");
            self.included_keys.insert(key.clone());
            self.result.included.push(Discovery {
                node: target,
                key,
                path: step.path.clone(),
            });
        }

        for &target in targets {
            for &child in &step.children {
                self.descend(target, plan_index, child)?;
            }
        }

        Ok(())
    }
}
