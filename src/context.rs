//! Conversion Context
//!
//! Shared state of one conversion run:
//! - the raw document (borrowed, never mutated)
//! - the IR being built
//! - the dependency graph, built on demand
//! - hook layers that override pointer classification and priority

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use tracing::trace;

use crate::error::{IrError, Result};
use crate::graph::{self, walk, GroupKind, GroupMatcher, Graph, PriorityFn, WalkOptions};
use crate::ir::{Model, SchemaObject};
use crate::pointer::{self, pointer_to_path};

// =============================================================================
// Hooks
// =============================================================================

pub type GroupHook = Box<dyn Fn(&str) -> Option<GroupKind> + Send + Sync>;
pub type PriorityHook = Box<dyn Fn(&str) -> Option<u64> + Send + Sync>;

/// One layer of overrides. Layers are consulted in registration order and
/// the first one that returns a value wins.
#[derive(Default)]
pub struct HookLayer {
    pub name: String,
    pub match_pointer_to_group: Option<GroupHook>,
    pub get_pointer_priority: Option<PriorityHook>,
}

impl HookLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_group_matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str) -> Option<GroupKind> + Send + Sync + 'static,
    {
        self.match_pointer_to_group = Some(Box::new(matcher));
        self
    }

    pub fn with_priority<F>(mut self, priority: F) -> Self
    where
        F: Fn(&str) -> Option<u64> + Send + Sync + 'static,
    {
        self.get_pointer_priority = Some(Box::new(priority));
        self
    }
}

impl fmt::Debug for HookLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookLayer")
            .field("name", &self.name)
            .field("match_pointer_to_group", &self.match_pointer_to_group.is_some())
            .field("get_pointer_priority", &self.get_pointer_priority.is_some())
            .finish()
    }
}

/// What [`Context::for_each`] hands to its visitor
#[derive(Debug, Clone)]
pub struct WalkEvent<'a, 's> {
    pub kind: GroupKind,
    pub pointer: &'a str,
    /// Unescaped pointer segments
    pub path: Vec<String>,
    pub tags: Option<&'a BTreeSet<String>>,
    pub node: &'s Value,
}

// =============================================================================
// Context
// =============================================================================

#[derive(Debug)]
pub struct Context<'s> {
    spec: &'s Value,
    pub ir: Model,
    graph: Option<Graph<'s>>,
    hooks: Vec<HookLayer>,
}

impl<'s> Context<'s> {
    pub fn new(spec: &'s Value) -> Self {
        Self {
            spec,
            ir: Model::default(),
            graph: None,
            hooks: Vec::new(),
        }
    }

    pub fn spec(&self) -> &'s Value {
        self.spec
    }

    /// Follow an internal `$ref` through the raw document.
    pub fn resolve_ref(&self, reference: &str) -> Result<&'s Value> {
        trace!(reference, "Resolving reference");
        pointer::resolve(self.spec, reference)
    }

    /// Resolve and deserialize the target.
    pub fn resolve_ref_as<T: DeserializeOwned>(&self, reference: &str) -> Result<T> {
        let value = self.resolve_ref(reference)?;
        Ok(T::deserialize(value)?)
    }

    /// One level of inlining: the target's members over the wrapper's, with
    /// `$ref` removed. Anything without a `$ref` comes back unchanged.
    pub fn dereference(&self, schema: &Value) -> Result<Value> {
        let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
            return Ok(schema.clone());
        };
        let target = self.resolve_ref(reference)?;

        let mut merged = match schema {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        if let Value::Object(resolved) = target {
            for (key, value) in resolved {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged.remove("$ref");
        Ok(Value::Object(merged))
    }

    /// Follow an IR `$ref` to a registered schema.
    pub fn resolve_ir_ref(&self, reference: &str) -> Result<&SchemaObject> {
        self.ir
            .resolve_schema_ref(reference)
            .ok_or_else(|| IrError::ReferenceNotFound(reference.to_string()))
    }

    /// Build the graph if it does not exist yet.
    pub fn build_graph(&mut self) -> &Graph<'s> {
        let spec = self.spec;
        self.graph.get_or_insert_with(|| graph::build_graph(spec))
    }

    pub fn graph(&self) -> Option<&Graph<'s>> {
        self.graph.as_ref()
    }

    pub fn register_hooks(&mut self, layer: HookLayer) {
        self.hooks.push(layer);
    }

    pub fn hooks(&self) -> &[HookLayer] {
        &self.hooks
    }

    /// Classify through the hook chain, then the built-in patterns.
    pub fn match_pointer_to_group(&self, pointer: &str) -> Option<GroupKind> {
        self.hooks
            .iter()
            .filter_map(|layer| layer.match_pointer_to_group.as_ref())
            .find_map(|hook| hook(pointer))
            .or_else(|| graph::match_pointer_to_group(pointer))
    }

    /// Priority from the first hook that has one. `None` lets the walker
    /// use its default.
    pub fn pointer_priority(&self, pointer: &str) -> Option<u64> {
        self.hooks
            .iter()
            .filter_map(|layer| layer.get_pointer_priority.as_ref())
            .find_map(|hook| hook(pointer))
    }

    /// Walk the graph and visit every pointer of the requested `kinds`
    /// (all kinds when empty). Strategies missing from `options` come from
    /// the hook chain.
    pub fn for_each<F>(&self, kinds: &[GroupKind], options: &WalkOptions<'_>, mut visit: F) -> Result<()>
    where
        F: FnMut(WalkEvent<'_, 's>),
    {
        let graph = self.graph.as_ref().ok_or(IrError::MissingGraph)?;

        let matcher = |pointer: &str| self.match_pointer_to_group(pointer);
        let priority = |pointer: &str| self.pointer_priority(pointer);
        let classify: GroupMatcher<'_> = match options.match_pointer_to_group {
            Some(custom) => custom,
            None => &matcher,
        };
        let rank: PriorityFn<'_> = match options.get_pointer_priority {
            Some(custom) => custom,
            None => &priority,
        };
        let effective = WalkOptions {
            order: options.order,
            prefer_groups: options.prefer_groups.clone(),
            match_pointer_to_group: Some(classify),
            get_pointer_priority: Some(rank),
        };

        walk(
            graph,
            |pointer, info| {
                let Some(kind) = classify(pointer) else {
                    return;
                };
                if !kinds.is_empty() && !kinds.contains(&kind) {
                    return;
                }
                visit(WalkEvent {
                    kind,
                    pointer,
                    path: pointer_to_path(pointer),
                    tags: info.tags.as_ref(),
                    node: info.node,
                });
            },
            &effective,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::WalkOrder;
    use crate::ir::SchemaType;
    use serde_json::json;

    fn spec() -> Value {
        json!({
            "openapi": "3.1.0",
            "paths": {
                "/pets": { "get": {
                    "tags": ["pets"],
                    "responses": { "200": { "content": { "application/json": {
                        "schema": { "$ref": "#/components/schemas/Pet" }
                    } } } }
                } }
            },
            "components": {
                "schemas": {
                    "Pet": { "type": "object", "properties": { "owner": { "$ref": "#/components/schemas/Owner" } } },
                    "Owner": { "type": "string", "description": "owner name" }
                },
                "parameters": { "Limit": { "name": "limit", "in": "query" } }
            },
            "servers": [{ "url": "https://api.example.com" }]
        })
    }

    #[test]
    fn test_resolve_ref() {
        let doc = spec();
        let ctx = Context::new(&doc);
        assert_eq!(
            ctx.resolve_ref("#/components/schemas/Owner").unwrap()["type"],
            "string"
        );
        match ctx.resolve_ref("#/components/schemas/Missing") {
            Err(err @ IrError::ReferenceNotFound(_)) => {
                assert_eq!(err.to_string(), "Reference not found: #/components/schemas/Missing")
            }
            other => panic!("Expected ReferenceNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_ref_as_deserializes() {
        let doc = spec();
        let ctx = Context::new(&doc);
        let server: crate::ir::Server = ctx.resolve_ref_as("#/servers/0").unwrap();
        assert_eq!(server.url, "https://api.example.com");
    }

    #[test]
    fn test_dereference_is_shallow_and_strips_ref() {
        let doc = spec();
        let ctx = Context::new(&doc);
        let merged = ctx
            .dereference(&json!({ "$ref": "#/components/schemas/Owner", "description": "wrapper", "title": "T" }))
            .unwrap();
        assert_eq!(
            merged,
            json!({ "description": "owner name", "title": "T", "type": "string" })
        );

        let pet = ctx.dereference(&json!({ "$ref": "#/components/schemas/Pet" })).unwrap();
        assert_eq!(
            pet["properties"]["owner"],
            json!({ "$ref": "#/components/schemas/Owner" })
        );

        let plain = json!({ "type": "integer" });
        assert_eq!(ctx.dereference(&plain).unwrap(), plain);
    }

    #[test]
    fn test_resolve_ir_ref() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.ir
            .components_mut()
            .schemas
            .insert("Owner".into(), SchemaObject::with_type(SchemaType::String));
        assert!(ctx.resolve_ir_ref("#/components/schemas/Owner").is_ok());
        assert!(matches!(
            ctx.resolve_ir_ref("#/components/schemas/Pet"),
            Err(IrError::ReferenceNotFound(_))
        ));
    }

    #[test]
    fn test_for_each_requires_graph() {
        let doc = spec();
        let ctx = Context::new(&doc);
        let result = ctx.for_each(&[], &WalkOptions::default(), |_| {});
        assert!(matches!(result, Err(IrError::MissingGraph)));
    }

    #[test]
    fn test_for_each_filters_kinds_in_dependency_order() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.build_graph();

        let mut seen = Vec::new();
        ctx.for_each(&[GroupKind::Schema, GroupKind::Operation], &WalkOptions::default(), |event| {
            seen.push((event.kind, event.pointer.to_string()));
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                (GroupKind::Schema, "#/components/schemas/Owner".to_string()),
                (GroupKind::Schema, "#/components/schemas/Pet".to_string()),
                (GroupKind::Operation, "#/paths/~1pets/get".to_string()),
            ]
        );
    }

    #[test]
    fn test_for_each_event_carries_path_and_tags() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.build_graph();

        let mut events = Vec::new();
        ctx.for_each(&[GroupKind::Operation], &WalkOptions::new(WalkOrder::Declarations), |event| {
            events.push((event.path.clone(), event.tags.cloned(), event.node["tags"].clone()));
        })
        .unwrap();

        assert_eq!(events.len(), 1);
        let (path, tags, raw) = &events[0];
        assert_eq!(path, &vec!["paths".to_string(), "/pets".to_string(), "get".to_string()]);
        assert_eq!(tags.as_ref().unwrap().iter().collect::<Vec<_>>(), vec!["pets"]);
        assert_eq!(raw, &json!(["pets"]));
    }

    #[test]
    fn test_first_hook_layer_wins() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.register_hooks(HookLayer::new("empty"));
        ctx.register_hooks(
            HookLayer::new("servers-as-schemas").with_group_matcher(|pointer| {
                pointer.starts_with("#/servers/").then_some(GroupKind::Schema)
            }),
        );
        ctx.register_hooks(
            HookLayer::new("shadowed")
                .with_group_matcher(|_| Some(GroupKind::Webhook))
                .with_priority(|_| Some(0)),
        );

        assert_eq!(ctx.match_pointer_to_group("#/servers/0"), Some(GroupKind::Schema));
        // the second layer declines, so the third answers
        assert_eq!(
            ctx.match_pointer_to_group("#/components/schemas/Pet"),
            Some(GroupKind::Webhook)
        );
        assert_eq!(ctx.pointer_priority("#/anything"), Some(0));
        assert_eq!(ctx.hooks().len(), 3);
    }

    #[test]
    fn test_hooks_fall_back_to_builtin_classifier() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.register_hooks(HookLayer::new("noop").with_group_matcher(|_| None));
        assert_eq!(
            ctx.match_pointer_to_group("#/components/parameters/Limit"),
            Some(GroupKind::Parameter)
        );
        assert_eq!(ctx.pointer_priority("#/components/parameters/Limit"), None);
    }

    #[test]
    fn test_for_each_uses_hook_classification() {
        let doc = spec();
        let mut ctx = Context::new(&doc);
        ctx.register_hooks(HookLayer::new("info").with_group_matcher(|pointer| {
            (pointer == "#/components/parameters/Limit").then_some(GroupKind::Webhook)
        }));
        ctx.build_graph();

        let mut webhooks = Vec::new();
        ctx.for_each(&[GroupKind::Webhook], &WalkOptions::default(), |event| {
            webhooks.push(event.pointer.to_string());
        })
        .unwrap();
        assert_eq!(webhooks, vec!["#/components/parameters/Limit"]);
    }
}
