//! Resource Metadata
//!
//! Per-resource summary (dependencies, tags, deprecation) keyed by a
//! namespaced id, e.g. `schema/Pet` or `operation/GET /pets`. Filters and
//! tree-shaking passes read this instead of walking the graph again.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use super::Graph;
use crate::ir::HttpMethod;
use crate::pointer::{is_top_level_component, pointer_to_path};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Namespaced ids this resource depends on, transitively
    pub dependencies: BTreeSet<String>,
    pub deprecated: bool,
    pub tags: BTreeSet<String>,
}

/// Resources grouped by kind, each in declaration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    pub operations: IndexMap<String, ResourceInfo>,
    pub parameters: IndexMap<String, ResourceInfo>,
    pub request_bodies: IndexMap<String, ResourceInfo>,
    pub responses: IndexMap<String, ResourceInfo>,
    pub schemas: IndexMap<String, ResourceInfo>,
}

impl ResourceMetadata {
    pub fn get(&self, id: &str) -> Option<&ResourceInfo> {
        let (namespace, _) = id.split_once('/')?;
        let bucket = match namespace {
            "operation" => &self.operations,
            "parameter" => &self.parameters,
            "body" => &self.request_bodies,
            "response" => &self.responses,
            "schema" => &self.schemas,
            _ => return None,
        };
        bucket.get(id)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
            + self.parameters.len()
            + self.request_bodies.len()
            + self.responses.len()
            + self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Namespaced id for a top-level component pointer.
pub fn component_resource_id(pointer: &str) -> Option<String> {
    if !is_top_level_component(pointer) {
        return None;
    }
    let path = pointer_to_path(pointer);
    let (kind, name) = match path.as_slice() {
        [_, kind, name] => (kind.as_str(), name),
        [kind, name] => (kind.as_str(), name),
        _ => return None,
    };
    let namespace = match kind {
        "schemas" | "definitions" => "schema",
        "parameters" => "parameter",
        "requestBodies" => "body",
        "responses" => "response",
        other => {
            warn!(kind = other, pointer, "Unsupported component type");
            return None;
        }
    };
    Some(format!("{}/{}", namespace, name))
}

/// Namespaced id for `#/paths/{path}/{method}`.
pub fn operation_resource_id(pointer: &str) -> Option<String> {
    match pointer_to_path(pointer).as_slice() {
        [root, path, method] if root == "paths" => {
            let method = method.parse::<HttpMethod>().ok()?;
            Some(format!("operation/{} {}", method.as_str().to_uppercase(), path))
        }
        _ => None,
    }
}

/// Collect metadata for every component and operation in `graph`.
pub fn build_resource_metadata(graph: &Graph<'_>) -> ResourceMetadata {
    let mut meta = ResourceMetadata::default();

    for (pointer, info) in &graph.nodes {
        let Some(id) = component_resource_id(pointer).or_else(|| operation_resource_id(pointer))
        else {
            continue;
        };

        let dependencies = graph
            .transitive_dependencies
            .get(pointer)
            .into_iter()
            .flatten()
            .filter_map(|dep| component_resource_id(dep))
            .filter(|dep| *dep != id)
            .collect();

        let resource = ResourceInfo {
            dependencies,
            deprecated: info.deprecated.unwrap_or(false),
            tags: info.tags.clone().unwrap_or_default(),
        };

        let bucket = match id.split_once('/').map(|(ns, _)| ns) {
            Some("operation") => &mut meta.operations,
            Some("parameter") => &mut meta.parameters,
            Some("body") => &mut meta.request_bodies,
            Some("response") => &mut meta.responses,
            _ => &mut meta.schemas,
        };
        bucket.insert(id, resource);
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use serde_json::json;

    #[test]
    fn test_resource_ids() {
        assert_eq!(
            component_resource_id("#/components/schemas/Pet").as_deref(),
            Some("schema/Pet")
        );
        assert_eq!(component_resource_id("#/definitions/Pet").as_deref(), Some("schema/Pet"));
        assert_eq!(
            component_resource_id("#/components/requestBodies/NewPet").as_deref(),
            Some("body/NewPet")
        );
        assert_eq!(component_resource_id("#/components/headers/X"), None);
        assert_eq!(component_resource_id("#/components/schemas/Pet/properties/id"), None);
        assert_eq!(
            operation_resource_id("#/paths/~1pets~1{id}/get").as_deref(),
            Some("operation/GET /pets/{id}")
        );
        assert_eq!(operation_resource_id("#/paths/~1pets/parameters"), None);
    }

    #[test]
    fn test_build_resource_metadata() {
        let spec = json!({
            "paths": { "/pets": { "post": {
                "tags": ["pets"],
                "deprecated": true,
                "requestBody": { "$ref": "#/components/requestBodies/NewPet" },
                "responses": { "200": { "$ref": "#/components/responses/PetResponse" } }
            } } },
            "components": {
                "schemas": {
                    "Pet": { "properties": { "owner": { "$ref": "#/components/schemas/Owner" } } },
                    "Owner": { "type": "string" }
                },
                "requestBodies": { "NewPet": {
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
                } },
                "responses": { "PetResponse": { "description": "ok" } }
            }
        });
        let graph = build_graph(&spec);
        let meta = build_resource_metadata(&graph);

        let op = meta.get("operation/POST /pets").unwrap();
        assert!(op.deprecated);
        assert_eq!(op.tags.iter().collect::<Vec<_>>(), vec!["pets"]);
        assert_eq!(
            op.dependencies.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["body/NewPet", "response/PetResponse", "schema/Owner", "schema/Pet"]
        );

        let pet = meta.get("schema/Pet").unwrap();
        assert_eq!(pet.dependencies.iter().collect::<Vec<_>>(), vec!["schema/Owner"]);
        assert!(!pet.deprecated);

        assert_eq!(
            meta.schemas.keys().collect::<Vec<_>>(),
            vec!["schema/Pet", "schema/Owner"]
        );
        assert_eq!(meta.len(), 5);
    }
}
