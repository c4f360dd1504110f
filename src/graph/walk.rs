//! Graph Walker
//!
//! Two orders:
//! - `Declarations`: insertion order, optionally bucketed by preferred group
//! - `Topological`: dependencies first, stable Kahn's algorithm keyed by
//!   `priority * 1_000_000 + insertion index`. A cycle is entered through
//!   its lowest-keyed member once everything outside it is done.
//!
//! Group preference in topological mode is validated: a proposed grouping
//! that would put a dependency after its dependent is thrown away.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use super::groups::{
    default_pointer_priority, match_pointer_to_group, GroupKind, DEFAULT_PREFER_GROUPS,
};
use super::{Graph, NodeInfo};
use crate::error::IrError;

const PRIORITY_STRIDE: u64 = 1_000_000;

/// Emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkOrder {
    Declarations,
    #[default]
    Topological,
}

impl fmt::Display for WalkOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declarations => f.write_str("declarations"),
            Self::Topological => f.write_str("topological"),
        }
    }
}

impl FromStr for WalkOrder {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "declarations" => Ok(Self::Declarations),
            "topological" => Ok(Self::Topological),
            other => Err(IrError::InvalidFormat(format!("unknown walk order '{}'", other))),
        }
    }
}

pub type GroupMatcher<'a> = &'a dyn Fn(&str) -> Option<GroupKind>;
pub type PriorityFn<'a> = &'a dyn Fn(&str) -> Option<u64>;

/// Walker configuration
///
/// Missing strategies fall back to [`match_pointer_to_group`] and
/// [`default_pointer_priority`].
#[derive(Clone)]
pub struct WalkOptions<'a> {
    pub order: WalkOrder,
    pub prefer_groups: Vec<GroupKind>,
    pub match_pointer_to_group: Option<GroupMatcher<'a>>,
    pub get_pointer_priority: Option<PriorityFn<'a>>,
}

impl Default for WalkOptions<'_> {
    fn default() -> Self {
        Self {
            order: WalkOrder::Topological,
            prefer_groups: DEFAULT_PREFER_GROUPS.to_vec(),
            match_pointer_to_group: None,
            get_pointer_priority: None,
        }
    }
}

impl fmt::Debug for WalkOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkOptions")
            .field("order", &self.order)
            .field("prefer_groups", &self.prefer_groups)
            .field("custom_matcher", &self.match_pointer_to_group.is_some())
            .field("custom_priority", &self.get_pointer_priority.is_some())
            .finish()
    }
}

impl<'a> WalkOptions<'a> {
    pub fn new(order: WalkOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn with_prefer_groups(mut self, groups: Vec<GroupKind>) -> Self {
        self.prefer_groups = groups;
        self
    }

    pub fn with_matcher(mut self, matcher: GroupMatcher<'a>) -> Self {
        self.match_pointer_to_group = Some(matcher);
        self
    }

    pub fn with_priority(mut self, priority: PriorityFn<'a>) -> Self {
        self.get_pointer_priority = Some(priority);
        self
    }

    fn group_of(&self, pointer: &str) -> Option<GroupKind> {
        match self.match_pointer_to_group {
            Some(matcher) => matcher(pointer),
            None => match_pointer_to_group(pointer),
        }
    }

    fn priority_of(&self, pointer: &str) -> u64 {
        match self.get_pointer_priority {
            Some(priority) => priority(pointer).unwrap_or_else(|| default_pointer_priority(pointer)),
            None => default_pointer_priority(pointer),
        }
    }

    /// Index in `prefer_groups`; unmatched pointers sort last.
    fn group_rank(&self, pointer: &str) -> usize {
        self.group_of(pointer)
            .and_then(|kind| self.prefer_groups.iter().position(|k| *k == kind))
            .unwrap_or(self.prefer_groups.len())
    }
}

/// Visit every node once in the order `options` asks for.
pub fn walk<'g, 's, F>(graph: &'g Graph<'s>, mut visit: F, options: &WalkOptions<'_>)
where
    F: FnMut(&'g str, &'g NodeInfo<'s>),
{
    for pointer in ordered_pointers(graph, options) {
        if let Some((key, info)) = graph.nodes.get_key_value(pointer) {
            visit(key.as_str(), info);
        }
    }
}

/// The emission order as a list.
pub fn ordered_pointers<'g>(graph: &'g Graph<'_>, options: &WalkOptions<'_>) -> Vec<&'g str> {
    match options.order {
        WalkOrder::Declarations => declaration_order(graph, options),
        WalkOrder::Topological => topological_order(graph, options),
    }
}

fn declaration_order<'g>(graph: &'g Graph<'_>, options: &WalkOptions<'_>) -> Vec<&'g str> {
    let pointers: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
    if options.prefer_groups.is_empty() {
        return pointers;
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(pointers.len());
    for kind in &options.prefer_groups {
        for pointer in &pointers {
            if options.group_of(pointer) == Some(*kind) && emitted.insert(*pointer) {
                order.push(*pointer);
            }
        }
    }
    for pointer in pointers {
        if !emitted.contains(pointer) {
            order.push(pointer);
        }
    }
    order
}

fn topological_order<'g>(graph: &'g Graph<'_>, options: &WalkOptions<'_>) -> Vec<&'g str> {
    let pointers: Vec<&'g str> = graph.nodes.keys().map(String::as_str).collect();

    let composite: HashMap<&str, u64> = pointers
        .iter()
        .enumerate()
        .map(|(index, pointer)| {
            let priority = options.priority_of(pointer);
            (
                *pointer,
                priority
                    .saturating_mul(PRIORITY_STRIDE)
                    .saturating_add(index as u64),
            )
        })
        .collect();

    // self-edges and edges leaving the node set do not constrain ordering
    let deps_of: HashMap<&str, Vec<&'g str>> = pointers
        .iter()
        .map(|pointer| {
            let deps = graph
                .ordering_dependencies(pointer)
                .into_iter()
                .filter(|dep| dep != pointer)
                .filter_map(|dep| graph.nodes.get_key_value(dep).map(|(k, _)| k.as_str()))
                .collect();
            (*pointer, deps)
        })
        .collect();

    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(pointers.len());
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for pointer in &pointers {
        let deps = &deps_of[pointer];
        in_degree.insert(*pointer, deps.len());
        for dep in deps {
            dependents.entry(*dep).or_default().push(*pointer);
        }
    }

    let mut heap: BinaryHeap<Reverse<(u64, &str)>> = pointers
        .iter()
        .filter(|pointer| in_degree[*pointer] == 0)
        .map(|pointer| Reverse((composite[pointer], *pointer)))
        .collect();

    let cyclic = cyclic_components(&pointers, &deps_of);
    let mut emitted: HashSet<&str> = HashSet::with_capacity(pointers.len());
    let mut order: Vec<&'g str> = Vec::with_capacity(pointers.len());
    loop {
        while let Some(Reverse((_, current))) = heap.pop() {
            if !emitted.insert(current) {
                continue;
            }
            order.push(current);
            for dependent in dependents.get(current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        heap.push(Reverse((composite[dependent], *dependent)));
                    }
                }
            }
        }

        // stuck on a cycle: release its first member whose outside deps are done
        let next = pointers
            .iter()
            .copied()
            .filter(|pointer| !emitted.contains(pointer))
            .filter(|pointer| {
                let Some(component) = cyclic.get(pointer) else {
                    return false;
                };
                deps_of[pointer]
                    .iter()
                    .all(|dep| emitted.contains(dep) || cyclic.get(dep) == Some(component))
            })
            .min_by_key(|pointer| composite[pointer]);
        match next {
            Some(pointer) => heap.push(Reverse((composite[pointer], pointer))),
            None => break,
        }
    }

    let mut remaining: Vec<&'g str> = pointers
        .iter()
        .copied()
        .filter(|pointer| !emitted.contains(pointer))
        .collect();
    remaining.sort_by_key(|pointer| composite[pointer]);
    order.extend(remaining);

    if options.prefer_groups.is_empty() {
        return order;
    }
    apply_group_preference(order, &deps_of, options)
}

/// Component id of every pointer that sits on a dependency cycle.
fn cyclic_components<'g>(
    pointers: &[&'g str],
    deps_of: &HashMap<&str, Vec<&'g str>>,
) -> HashMap<&'g str, usize> {
    let mut dag: DiGraph<&str, ()> = DiGraph::new();
    let indices: HashMap<&str, NodeIndex> = pointers
        .iter()
        .map(|pointer| (*pointer, dag.add_node(*pointer)))
        .collect();
    for pointer in pointers {
        for dep in &deps_of[pointer] {
            dag.update_edge(indices[pointer], indices[dep], ());
        }
    }

    kosaraju_scc(&dag)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .enumerate()
        .flat_map(|(component, scc)| {
            scc.into_iter()
                .map(move |index| (pointers[index.index()], component))
        })
        .collect()
}

/// Stable-sort by group rank; keep the proposal only if no dependency from
/// a later group would land after its dependent.
fn apply_group_preference<'g>(
    order: Vec<&'g str>,
    deps_of: &HashMap<&str, Vec<&'g str>>,
    options: &WalkOptions<'_>,
) -> Vec<&'g str> {
    let rank: HashMap<&str, usize> = order
        .iter()
        .map(|pointer| (*pointer, options.group_rank(pointer)))
        .collect();

    let mut proposed = order.clone();
    proposed.sort_by_key(|pointer| rank[pointer]);

    let position: HashMap<&str, usize> = proposed
        .iter()
        .enumerate()
        .map(|(index, pointer)| (*pointer, index))
        .collect();

    let violated = deps_of.iter().any(|(node, deps)| {
        deps.iter()
            .any(|dep| rank[dep] > rank[node] && position[dep] >= position[node])
    });

    if violated {
        order
    } else {
        proposed
    }
}
