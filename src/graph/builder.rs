//! Graph Builder
//!
//! Single pre-order pass over the document, then three fix-ups:
//! - scope propagation through children and `$ref` targets
//! - transitive closure of subtree dependencies
//! - reverse index of direct dependencies

use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::{Graph, NodeInfo, Scope};
use crate::ir::HttpMethod;
use crate::pointer::{canonical_ref, child_pointer, Segment};

/// Build the dependency graph for `spec`.
///
/// The root is `#`. Only internal references (starting with `#`) count as
/// dependencies; external ones are out of reach here.
pub fn build_graph(spec: &Value) -> Graph<'_> {
    let mut builder = Builder::default();
    builder.visit(spec, "#".to_string(), None, None, &Inherited::default());

    let Builder {
        mut graph,
        children,
        own_scopes,
    } = builder;

    propagate_scopes(&mut graph, &children, own_scopes);
    graph.transitive_dependencies = transitive_closure(&graph.subtree_dependencies);

    for (pointer, deps) in &graph.node_dependencies {
        for dep in deps {
            graph
                .reverse_node_dependencies
                .entry(dep.clone())
                .or_default()
                .insert(pointer.clone());
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Built spec graph"
    );
    graph
}

#[derive(Default, Clone)]
struct Inherited {
    tags: Option<BTreeSet<String>>,
    deprecated: bool,
}

#[derive(Default)]
struct Builder<'s> {
    graph: Graph<'s>,
    children: HashMap<String, Vec<String>>,
    own_scopes: HashMap<String, BTreeSet<Scope>>,
}

impl<'s> Builder<'s> {
    /// Returns the subtree dependencies of `value`.
    fn visit(
        &mut self,
        value: &'s Value,
        pointer: String,
        key: Option<Segment>,
        parent: Option<String>,
        inherited: &Inherited,
    ) -> BTreeSet<String> {
        let mut here = inherited.clone();
        let mut own_deps = BTreeSet::new();

        if let Value::Object(map) = value {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if reference.starts_with('#') {
                    own_deps.insert(canonical_ref(reference));
                }
            }
            if map.get("deprecated") == Some(&Value::Bool(true)) {
                here.deprecated = true;
            }
            if is_operation(&pointer) {
                let tags: BTreeSet<String> = map
                    .get("tags")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                if !tags.is_empty() {
                    here.tags.get_or_insert_with(BTreeSet::new).extend(tags);
                }
            }

            let mut scopes = BTreeSet::new();
            if map.get("readOnly") == Some(&Value::Bool(true)) {
                scopes.insert(Scope::Read);
            }
            if map.get("writeOnly") == Some(&Value::Bool(true)) {
                scopes.insert(Scope::Write);
            }
            if !scopes.is_empty() {
                self.own_scopes.insert(pointer.clone(), scopes);
            }
        }

        self.graph.nodes.insert(
            pointer.clone(),
            NodeInfo {
                key,
                node: value,
                parent_pointer: parent,
                tags: here.tags.clone(),
                scopes: None,
                deprecated: here.deprecated.then_some(true),
            },
        );

        let mut subtree = own_deps.clone();
        let mut kids = Vec::new();
        for (segment, child) in containers(value) {
            let child_ptr = child_pointer(&pointer, &segment);
            kids.push(child_ptr.clone());
            let child_deps = self.visit(child, child_ptr, Some(segment), Some(pointer.clone()), &here);
            subtree.extend(child_deps);
        }

        if !kids.is_empty() {
            self.children.insert(pointer.clone(), kids);
        }
        if !own_deps.is_empty() {
            self.graph.node_dependencies.insert(pointer.clone(), own_deps);
        }
        if !subtree.is_empty() {
            self.graph
                .subtree_dependencies
                .insert(pointer, subtree.clone());
        }
        subtree
    }
}

/// Object and array children of a container, in document order.
fn containers(value: &Value) -> Vec<(Segment, &Value)> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| v.is_object() || v.is_array())
            .map(|(k, v)| (Segment::Name(k.clone()), v))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_object() || v.is_array())
            .map(|(i, v)| (Segment::Index(i), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// `#/paths/{path}/{method}` or `#/webhooks/{name}/{method}`
fn is_operation(pointer: &str) -> bool {
    let mut parts = pointer.split('/');
    let (Some("#"), Some(root), Some(_), Some(method), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    (root == "paths" || root == "webhooks") && method.parse::<HttpMethod>().is_ok()
}

/// Children and `$ref` targets both contribute scopes. Iterate to a
/// fixpoint, bottom-up first so most of the work lands in one pass.
fn propagate_scopes(
    graph: &mut Graph<'_>,
    children: &HashMap<String, Vec<String>>,
    mut scopes: HashMap<String, BTreeSet<Scope>>,
) {
    let order: Vec<String> = graph.nodes.keys().rev().cloned().collect();
    loop {
        let mut changed = false;
        for pointer in &order {
            let mut incoming = BTreeSet::new();
            let sources = children
                .get(pointer)
                .into_iter()
                .flatten()
                .chain(graph.node_dependencies.get(pointer).into_iter().flatten());
            for source in sources {
                if let Some(found) = scopes.get(source) {
                    incoming.extend(found.iter().copied());
                }
            }
            if incoming.is_empty() {
                continue;
            }
            let current = scopes.entry(pointer.clone()).or_default();
            let before = current.len();
            current.extend(incoming);
            changed |= current.len() != before;
        }
        if !changed {
            break;
        }
    }

    for (pointer, found) in scopes {
        if let Some(info) = graph.nodes.get_mut(&pointer) {
            info.scopes = Some(found);
        }
    }
}

/// Everything reachable through subtree dependencies. Cycles are fine.
fn transitive_closure(
    subtree: &HashMap<String, BTreeSet<String>>,
) -> HashMap<String, BTreeSet<String>> {
    let mut closure = HashMap::with_capacity(subtree.len());
    for (pointer, direct) in subtree {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = direct.iter().map(String::as_str).collect();
        while let Some(dep) = stack.pop() {
            if !seen.insert(dep) {
                continue;
            }
            if let Some(next) = subtree.get(dep) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        closure.insert(
            pointer.clone(),
            seen.into_iter().map(str::to_string).collect(),
        );
    }
    closure
}
