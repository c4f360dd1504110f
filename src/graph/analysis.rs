//! Cycle Analysis
//!
//! Strongly connected components over top-level resources. A `$ref` deep
//! inside a component is attributed to the component that owns it, so
//! `Foo.properties.next -> Foo` shows up as a self-referential group.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Graph;

/// Mutually recursive top-level resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleGroup {
    /// Stable id, in order of the first member's declaration
    pub id: usize,
    /// Members in declaration order
    pub members: Vec<String>,
    /// Single member that references itself
    pub is_self_referential: bool,
}

/// Find every cycle between top-level resources.
pub fn find_cycles(graph: &Graph<'_>) -> Vec<CycleGroup> {
    let mut dag: DiGraph<&str, ()> = DiGraph::new();
    let mut indices: HashMap<&str, NodeIndex> = HashMap::new();
    let mut declared: HashMap<&str, usize> = HashMap::new();

    for (position, pointer) in graph.nodes.keys().enumerate() {
        if graph.top_level_owner(pointer) == Some(pointer.as_str()) {
            indices.insert(pointer.as_str(), dag.add_node(pointer.as_str()));
            declared.insert(pointer.as_str(), position);
        }
    }

    let mut self_loops = Vec::new();
    for pointer in graph.nodes.keys() {
        let Some(&from) = indices.get(pointer.as_str()) else {
            continue;
        };
        let Some(deps) = graph.subtree_dependencies.get(pointer) else {
            continue;
        };
        for dep in deps {
            let Some(owner) = graph.top_level_owner(dep) else {
                continue;
            };
            let Some(&to) = indices.get(owner) else {
                continue;
            };
            if from == to {
                self_loops.push(from);
            }
            dag.update_edge(from, to, ());
        }
    }

    let mut groups: Vec<Vec<&str>> = kosaraju_scc(&dag)
        .into_iter()
        .filter(|scc| scc.len() > 1 || self_loops.contains(&scc[0]))
        .map(|scc| {
            let mut members: Vec<&str> = scc.into_iter().map(|idx| dag[idx]).collect();
            members.sort_by_key(|m| declared[m]);
            members
        })
        .collect();
    groups.sort_by_key(|members| declared[members[0]]);

    groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| CycleGroup {
            id,
            is_self_referential: members.len() == 1,
            members: members.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use serde_json::json;

    #[test]
    fn test_mutual_and_self_references() {
        let spec = json!({
            "components": { "schemas": {
                "Foo": { "properties": { "bar": { "$ref": "#/components/schemas/Bar" } } },
                "Bar": { "type": "string" },
                "Baz": { "properties": { "qux": { "$ref": "#/components/schemas/Qux" } } },
                "Qux": { "properties": { "baz": { "$ref": "#/components/schemas/Baz" } } },
                "Node": { "properties": { "next": { "$ref": "#/components/schemas/Node" } } }
            } }
        });
        let graph = build_graph(&spec);
        let cycles = find_cycles(&graph);

        assert_eq!(cycles.len(), 2);
        assert_eq!(
            cycles[0].members,
            vec!["#/components/schemas/Baz", "#/components/schemas/Qux"]
        );
        assert!(!cycles[0].is_self_referential);
        assert_eq!(cycles[1].members, vec!["#/components/schemas/Node"]);
        assert!(cycles[1].is_self_referential);
        assert_eq!(cycles[1].id, 1);
    }

    #[test]
    fn test_acyclic_document_has_no_cycles() {
        let spec = json!({
            "paths": { "/a": { "get": { "responses": { "200": {
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/A" } } }
            } } } } },
            "components": { "schemas": { "A": { "type": "string" } } }
        });
        assert!(find_cycles(&build_graph(&spec)).is_empty());
    }

    #[test]
    fn test_cycles_are_stable_across_graph_builds() {
        let spec = json!({
            "components": { "schemas": {
                "A": { "properties": { "b": { "$ref": "#/components/schemas/B" } } },
                "B": { "properties": { "a": { "$ref": "#/components/schemas/A" },
                                       "c": { "$ref": "#/components/schemas/C" } } },
                "C": { "items": { "$ref": "#/components/schemas/D" } },
                "D": { "allOf": [ { "$ref": "#/components/schemas/C" } ] },
                "E": { "properties": { "e": { "$ref": "#/components/schemas/E" } } },
                "F": { "properties": { "a": { "$ref": "#/components/schemas/A" } } }
            } }
        });
        let first = find_cycles(&build_graph(&spec));
        assert_eq!(first.len(), 3);
        assert_eq!(
            first[0].members,
            vec!["#/components/schemas/A", "#/components/schemas/B"]
        );
        assert_eq!(
            first[1].members,
            vec!["#/components/schemas/C", "#/components/schemas/D"]
        );
        assert_eq!(first[2].members, vec!["#/components/schemas/E"]);

        for _ in 0..16 {
            assert_eq!(find_cycles(&build_graph(&spec)), first);
        }
    }
}
