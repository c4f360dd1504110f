//! Spec Dependency Graph
//!
//! Arena-by-pointer view of a raw OpenAPI document. Every object or array
//! in the document is a node keyed by its JSON Pointer; `$ref` edges live in
//! flat maps so cycles are plain edges rather than recursive structures.
//!
//! Consumers:
//! - the topological walker (emission order)
//! - resource metadata (tree-shaking / filtering)
//! - cycle analysis (mutually recursive components)

pub mod analysis;
pub mod builder;
pub mod groups;
pub mod meta;
pub mod walk;

pub use analysis::{find_cycles, CycleGroup};
pub use builder::build_graph;
pub use groups::{
    default_pointer_priority, match_pointer_to_group, match_top_level_pointer, GroupKind,
    DEFAULT_PREFER_GROUPS, NEUTRAL_PRIORITY,
};
pub use meta::{build_resource_metadata, ResourceInfo, ResourceMetadata};
pub use walk::{ordered_pointers, walk, GroupMatcher, PriorityFn, WalkOptions, WalkOrder};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use crate::pointer::Segment;

/// Access scope contributed by `readOnly` / `writeOnly`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Read,
    Write,
}

/// Everything the graph knows about one node
#[derive(Debug, Clone)]
pub struct NodeInfo<'s> {
    /// Position in the parent: member name or array index. `None` for the root.
    pub key: Option<Segment>,
    /// The raw subtree this pointer addresses
    pub node: &'s Value,
    /// `None` for the root
    pub parent_pointer: Option<String>,
    /// Operation tags inherited from the enclosing operation
    pub tags: Option<BTreeSet<String>>,
    /// Read/write scopes found in this subtree or through its references
    pub scopes: Option<BTreeSet<Scope>>,
    /// Set when this node or an ancestor is deprecated
    pub deprecated: Option<bool>,
}

impl<'s> NodeInfo<'s> {
    /// A detached node, used when assembling graphs by hand.
    pub fn detached(node: &'s Value) -> Self {
        Self {
            key: None,
            node,
            parent_pointer: None,
            tags: None,
            scopes: None,
            deprecated: None,
        }
    }
}

/// Dependency graph over a document
///
/// Built once, read many times. Dependency sets are only present for
/// pointers that actually have dependencies.
#[derive(Debug, Clone, Default)]
pub struct Graph<'s> {
    /// Nodes in document pre-order
    pub nodes: IndexMap<String, NodeInfo<'s>>,
    /// `$ref` targets attached directly to a node
    pub node_dependencies: HashMap<String, BTreeSet<String>>,
    /// `$ref` targets anywhere under a node (itself included)
    pub subtree_dependencies: HashMap<String, BTreeSet<String>>,
    /// Closure of `subtree_dependencies`
    pub transitive_dependencies: HashMap<String, BTreeSet<String>>,
    /// Pointer -> nodes whose own `$ref` targets it
    pub reverse_node_dependencies: HashMap<String, BTreeSet<String>>,
}

impl<'s> Graph<'s> {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of direct `$ref` edges
    pub fn edge_count(&self) -> usize {
        self.node_dependencies.values().map(BTreeSet::len).sum()
    }

    pub fn get(&self, pointer: &str) -> Option<&NodeInfo<'s>> {
        self.nodes.get(pointer)
    }

    pub fn contains(&self, pointer: &str) -> bool {
        self.nodes.contains_key(pointer)
    }

    /// Dependencies used for ordering: direct and subtree edges combined.
    ///
    /// In a built graph direct edges are a subset of subtree edges; the
    /// union only matters for hand-assembled graphs.
    pub fn ordering_dependencies(&self, pointer: &str) -> BTreeSet<&str> {
        let mut deps = BTreeSet::new();
        for source in [&self.node_dependencies, &self.subtree_dependencies] {
            if let Some(set) = source.get(pointer) {
                deps.extend(set.iter().map(String::as_str));
            }
        }
        deps
    }

    /// Nearest ancestor-or-self that the classifier recognises.
    pub fn top_level_owner(&self, pointer: &str) -> Option<&str> {
        let mut current = pointer;
        loop {
            if match_pointer_to_group(current).is_some() {
                return self.nodes.get_key_value(current).map(|(k, _)| k.as_str());
            }
            current = self.nodes.get(current)?.parent_pointer.as_deref()?;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub static EMPTY: Value = Value::Null;

    /// Hand-assembled graph where every listed pointer is a detached node.
    pub fn graph_with_nodes(pointers: &[&str]) -> Graph<'static> {
        let mut graph = Graph::default();
        for pointer in pointers {
            graph
                .nodes
                .insert(pointer.to_string(), NodeInfo::detached(&EMPTY));
        }
        graph
    }

    /// Add `from -> to` edges to both direct and subtree maps.
    pub fn add_edges(graph: &mut Graph<'static>, from: &str, to: &[&str]) {
        for target in to {
            graph
                .node_dependencies
                .entry(from.to_string())
                .or_default()
                .insert(target.to_string());
            graph
                .subtree_dependencies
                .entry(from.to_string())
                .or_default()
                .insert(target.to_string());
            graph
                .reverse_node_dependencies
                .entry(target.to_string())
                .or_default()
                .insert(from.to_string());
        }
    }
}
