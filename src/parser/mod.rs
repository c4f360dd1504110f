//! OpenAPI to IR
//!
//! [`parse_spec`] detects the dialect, then converts in this order:
//!
//! - reusable schemas (`components/schemas` or 2.0 `definitions`)
//! - 3.x `parameters`, `requestBodies` and `responses` components
//! - servers
//! - paths
//! - 3.1 webhooks

pub mod dialect;
pub mod discriminator;
pub mod operation;
pub mod schema;

pub use dialect::SpecVersion;
pub use discriminator::DiscriminatorPropertyType;
pub use operation::{derived_operation_id, pick_media_type, OperationIds};
pub use schema::{schema_to_ir, SchemaConverter, SchemaState};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::ir::{Model, Server};
use crate::pointer::encode_segment;

/// Convert a whole document.
pub fn parse_spec(spec: &Value) -> Result<Model> {
    let mut ctx = Context::new(spec);
    parse_into(&mut ctx)?;
    Ok(ctx.ir)
}

/// Convert the context's document into `ctx.ir`.
pub fn parse_into(ctx: &mut Context<'_>) -> Result<SpecVersion> {
    let spec = ctx.spec();
    let version = SpecVersion::detect(spec)?;
    let mut converter = SchemaConverter::new(ctx, version);

    parse_schemas(&mut converter, spec)?;
    if version != SpecVersion::V2_0 {
        parse_components(&mut converter, spec)?;
    }

    let servers = parse_servers(spec, version)?;
    if !servers.is_empty() {
        converter.context().ir.servers = Some(servers);
    }

    let mut ids = OperationIds::new();
    if let Some(paths) = spec.get("paths").and_then(Value::as_object) {
        let parsed = operation::parse_path_items(&mut converter, paths, &mut ids)?;
        if !parsed.is_empty() {
            converter.context().ir.paths = Some(parsed);
        }
    }
    if version == SpecVersion::V3_1 {
        if let Some(webhooks) = spec.get("webhooks").and_then(Value::as_object) {
            let parsed = operation::parse_path_items(&mut converter, webhooks, &mut ids)?;
            if !parsed.is_empty() {
                converter.context().ir.webhooks = Some(parsed);
            }
        }
    }

    let ir = &converter.context().ir;
    debug!(
        version = %version,
        schemas = ir.components.as_ref().map_or(0, |c| c.schemas.len()),
        operations = ir.operations().count(),
        "Parsed specification"
    );
    Ok(version)
}

fn schema_container(spec: &Value, version: SpecVersion) -> Option<&Map<String, Value>> {
    match version {
        SpecVersion::V2_0 => spec.get("definitions"),
        SpecVersion::V3_0 | SpecVersion::V3_1 => spec.get("components")?.get("schemas"),
    }
    .and_then(Value::as_object)
}

/// Register every declared schema once, then restore declaration order.
fn parse_schemas(converter: &mut SchemaConverter<'_, '_>, spec: &Value) -> Result<()> {
    let version = converter.version();
    let Some(declared) = schema_container(spec, version).filter(|d| !d.is_empty()) else {
        return Ok(());
    };

    for name in declared.keys() {
        let reference = format!("{}/{}", version.schemas_pointer(), encode_segment(name));
        converter.register_component(&reference)?;
    }

    let schemas = &mut converter.context().ir.components_mut().schemas;
    let mut ordered = IndexMap::with_capacity(schemas.len());
    for name in declared.keys() {
        if let Some(schema) = schemas.shift_remove(name) {
            ordered.insert(name.clone(), schema);
        }
    }
    ordered.extend(schemas.drain(..));
    *schemas = ordered;
    Ok(())
}

fn parse_components(converter: &mut SchemaConverter<'_, '_>, spec: &Value) -> Result<()> {
    let Some(components) = spec.get("components") else {
        return Ok(());
    };
    let section = |key: &str| {
        components
            .get(key)
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
    };

    for (name, raw) in section("parameters") {
        let raw = match raw.get("$ref").and_then(Value::as_str) {
            Some(reference) => converter.context().resolve_ref(reference)?,
            None => raw,
        };
        if let Some(parameter) = operation::parse_parameter(converter, raw)? {
            converter
                .context()
                .ir
                .components_mut()
                .parameters
                .insert(name.clone(), parameter);
        }
    }

    for (name, raw) in section("requestBodies") {
        let raw = match raw.get("$ref").and_then(Value::as_str) {
            Some(reference) => converter.context().resolve_ref(reference)?,
            None => raw,
        };
        if let Some(body) = operation::parse_request_body(converter, raw)? {
            converter
                .context()
                .ir
                .components_mut()
                .request_bodies
                .insert(name.clone(), body);
        }
    }

    for (name, raw) in section("responses") {
        let response = operation::parse_response(converter, name, raw, &[])?;
        converter
            .context()
            .ir
            .components_mut()
            .responses
            .insert(name.clone(), response);
    }
    Ok(())
}

/// 3.x `servers`; 2.0 builds one from `schemes`, `host` and `basePath`.
fn parse_servers(spec: &Value, version: SpecVersion) -> Result<Vec<Server>> {
    if version != SpecVersion::V2_0 {
        return match spec.get("servers") {
            Some(servers) => Ok(Vec::<Server>::deserialize(servers)?),
            None => Ok(Vec::new()),
        };
    }

    let Some(host) = spec.get("host").and_then(Value::as_str) else {
        return Ok(Vec::new());
    };
    let base_path = spec.get("basePath").and_then(Value::as_str).unwrap_or_default();
    let scheme = spec
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|schemes| schemes.first())
        .and_then(Value::as_str);
    let url = match scheme {
        Some(scheme) => format!("{}://{}{}", scheme, host, base_path),
        None => format!("//{}{}", host, base_path),
    };
    Ok(vec![Server { url, description: None }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrError;
    use crate::ir::{HttpMethod, SchemaObject, SchemaType};
    use serde_json::json;

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(
            parse_spec(&json!({ "openapi": "2.0.0" })),
            Err(IrError::UnsupportedSpec(_))
        ));
        match parse_spec(&json!({ "info": { "title": "x" } })) {
            Err(err @ IrError::UnsupportedSpec(_)) => {
                assert!(err.to_string().starts_with("Unsupported OpenAPI specification"))
            }
            other => panic!("Expected UnsupportedSpec, got {:?}", other),
        }
    }

    #[test]
    fn test_schemas_keep_declaration_order() {
        let spec = json!({
            "openapi": "3.0.3",
            "components": { "schemas": {
                "Foo": { "allOf": [
                    { "$ref": "#/components/schemas/Bar" },
                    { "type": "object", "properties": { "x": { "type": "string" } } }
                ] },
                "Baz": { "type": "string" },
                "Bar": { "type": "object", "properties": { "y": { "type": "number" } } }
            } }
        });
        let model = parse_spec(&spec).unwrap();
        let schemas = &model.components.as_ref().unwrap().schemas;
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["Foo", "Baz", "Bar"]);
        assert_eq!(schemas["Baz"], SchemaObject::with_type(SchemaType::String));
    }

    #[test]
    fn test_components_sections() {
        let spec = json!({
            "openapi": "3.1.0",
            "components": {
                "parameters": {
                    "Limit": { "name": "limit", "in": "query", "schema": { "type": "integer" } },
                    "Alias": { "$ref": "#/components/parameters/Limit" }
                },
                "requestBodies": {
                    "NewPet": { "content": { "application/json": { "schema": { "type": "object" } } } }
                },
                "responses": {
                    "NotFound": { "description": "missing" }
                }
            }
        });
        let model = parse_spec(&spec).unwrap();
        let components = model.components.unwrap();
        assert_eq!(components.parameters["Alias"].name, "limit");
        assert_eq!(
            components.request_bodies["NewPet"].media_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(components.responses["NotFound"].schema.schema_type, Some(SchemaType::Unknown));
    }

    #[test]
    fn test_servers() {
        let swagger = json!({ "swagger": "2.0", "host": "api.example.com", "basePath": "/v1", "schemes": ["https", "http"] });
        let model = parse_spec(&swagger).unwrap();
        assert_eq!(model.servers.unwrap()[0].url, "https://api.example.com/v1");

        let relative = json!({ "swagger": "2.0", "host": "api.example.com" });
        assert_eq!(parse_spec(&relative).unwrap().servers.unwrap()[0].url, "//api.example.com");

        let openapi = json!({
            "openapi": "3.0.0",
            "servers": [{ "url": "https://example.com", "description": "prod", "variables": {} }]
        });
        let servers = parse_spec(&openapi).unwrap().servers.unwrap();
        assert_eq!(servers[0].description.as_deref(), Some("prod"));
    }

    #[test]
    fn test_webhooks_only_in_3_1() {
        let webhook = json!({ "newPet": { "post": { "responses": { "200": { "description": "ok" } } } } });
        let v31 = json!({ "openapi": "3.1.0", "webhooks": webhook.clone() });
        let model = parse_spec(&v31).unwrap();
        let post = &model.webhooks.unwrap()["newPet"][&HttpMethod::Post];
        assert_eq!(post.id, "postNewPet");

        let v30 = json!({ "openapi": "3.0.0", "webhooks": webhook });
        assert!(parse_spec(&v30).unwrap().webhooks.is_none());
    }
}
