//! Operations
//!
//! Path items and webhooks with their parameters, request bodies and
//! responses. 2.0 `body` and `formData` parameters are folded into a request
//! body here.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::dialect::SpecVersion;
use super::schema::{SchemaConverter, SchemaState};
use crate::error::Result;
use crate::ir::{
    HttpMethod, Operation, Parameter, ParameterLocation, Parameters, PathItem, RequestBody,
    Response, SchemaObject, SchemaType,
};

/// Keys of a 2.0 parameter that describe the parameter, not its value.
const PARAMETER_KEYS: [&str; 6] = ["name", "in", "required", "collectionFormat", "allowEmptyValue", "description"];

// =============================================================================
// Operation ids
// =============================================================================

/// Hands out document-unique operation ids.
#[derive(Debug, Default)]
pub struct OperationIds {
    taken: HashSet<String>,
}

impl OperationIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// `operationId` when declared, otherwise derived from method and path.
    /// Collisions get a numeric suffix starting at 2.
    pub fn claim(&mut self, operation_id: Option<&str>, method: HttpMethod, path: &str) -> String {
        let base = match operation_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => derived_operation_id(method, path),
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}

/// `get /pets/{petId}/toys` -> `getPetsByPetIdToys`
pub fn derived_operation_id(method: HttpMethod, path: &str) -> String {
    let mut id = method.as_str().to_string();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(parameter) => {
                id.push_str("By");
                id.push_str(&pascal_case(parameter));
            }
            None => id.push_str(&pascal_case(segment)),
        }
    }
    id
}

fn pascal_case(segment: &str) -> String {
    segment
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

// =============================================================================
// Helpers
// =============================================================================

fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// JSON first, otherwise the first declared.
pub fn pick_media_type<'a, I>(candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let candidates: Vec<&str> = candidates.into_iter().collect();
    candidates
        .iter()
        .find(|candidate| is_json_media_type(candidate))
        .or_else(|| candidates.first())
        .copied()
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn flag(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// `{ description, ...schema }`, dropping an absent description.
fn described(description: Option<&Value>, schema: Option<&Value>) -> Value {
    let mut combined = Map::new();
    if let Some(description) = description {
        combined.insert("description".into(), description.clone());
    }
    if let Some(Value::Object(schema)) = schema {
        combined.extend(schema.clone());
    }
    Value::Object(combined)
}

/// `{ allOf: [schema], description }` keeps a referenced body distinct from
/// the shared component it points at.
fn wrapped_ref(description: Option<&Value>, schema: &Value) -> Value {
    let mut wrapper = json!({ "allOf": [schema.clone()] });
    if let (Some(description), Value::Object(map)) = (description, &mut wrapper) {
        map.insert("description".into(), description.clone());
    }
    wrapper
}

fn is_ref(value: Option<&Value>) -> bool {
    value.is_some_and(|v| v.get("$ref").is_some())
}

fn extensions(value: &Value) -> IndexMap<String, Value> {
    value
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, _)| key.starts_with("x-"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn resolve<'a, 's: 'a>(converter: &mut SchemaConverter<'_, 's>, value: &'a Value) -> Result<&'a Value> {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) => converter.context().resolve_ref(reference),
        None => Ok(value),
    }
}

/// `consumes`/`produces` of the operation, else of the document.
fn swagger_media_types<'a>(operation: &'a Value, root: &'a Value, key: &str) -> Vec<&'a str> {
    operation
        .get(key)
        .or_else(|| root.get(key))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect()
}

// =============================================================================
// Parameters
// =============================================================================

/// Parameters declared at one level, before inheritance.
#[derive(Debug, Default)]
struct ParameterSet<'a> {
    parameters: Parameters,
    /// 2.0 `in: body`
    body: Option<&'a Value>,
    /// 2.0 `in: formData`, declaration order
    form: Vec<&'a Value>,
}

impl<'a> ParameterSet<'a> {
    /// `own` wins over what the path item declares.
    fn inherit(self, own: ParameterSet<'a>) -> ParameterSet<'a> {
        let own_form: HashSet<&str> = own
            .form
            .iter()
            .filter_map(|field| field.get("name").and_then(Value::as_str))
            .collect();
        let mut form: Vec<&'a Value> = self
            .form
            .into_iter()
            .filter(|field| {
                field
                    .get("name")
                    .and_then(Value::as_str)
                    .map_or(true, |name| !own_form.contains(name))
            })
            .collect();
        form.extend(own.form);

        ParameterSet {
            parameters: self.parameters.merge(own.parameters),
            body: own.body.or(self.body),
            form,
        }
    }
}

fn collect_parameters<'a, 's: 'a>(
    converter: &mut SchemaConverter<'_, 's>,
    list: Option<&'a Value>,
) -> Result<ParameterSet<'a>> {
    let mut set = ParameterSet::default();
    let swagger = converter.version() == SpecVersion::V2_0;

    for entry in list.and_then(Value::as_array).into_iter().flatten() {
        let raw = resolve(converter, entry)?;
        match raw.get("in").and_then(Value::as_str) {
            Some("body") if swagger => set.body = Some(raw),
            Some("formData") if swagger => set.form.push(raw),
            _ => {
                if let Some(parameter) = parse_parameter(converter, raw)? {
                    set.parameters.insert(parameter);
                }
            }
        }
    }
    Ok(set)
}

/// Where the value schema of a parameter lives in each dialect.
fn parameter_schema_source(version: SpecVersion, raw: &Value) -> Option<Value> {
    if let Some(schema) = raw.get("schema") {
        return Some(schema.clone());
    }
    if let Some(content) = raw.get("content").and_then(Value::as_object) {
        let media_type = pick_media_type(content.keys().map(String::as_str))?;
        return content.get(media_type)?.get("schema").cloned();
    }
    if version == SpecVersion::V2_0 {
        let mut schema = raw.as_object()?.clone();
        for key in PARAMETER_KEYS {
            schema.remove(key);
        }
        if schema.get("type").and_then(Value::as_str) == Some("file") {
            schema.insert("type".into(), json!("string"));
            schema.insert("format".into(), json!("binary"));
        }
        return Some(Value::Object(schema));
    }
    None
}

/// One `path`, `query`, `header` or `cookie` parameter. Other locations are
/// skipped with a warning.
pub fn parse_parameter(converter: &mut SchemaConverter<'_, '_>, raw: &Value) -> Result<Option<Parameter>> {
    let Some(name) = raw.get("name").and_then(Value::as_str) else {
        warn!("Skipping parameter without a name");
        return Ok(None);
    };
    let declared = raw.get("in").and_then(Value::as_str).unwrap_or_default();
    let Some(location) = ParameterLocation::parse(declared) else {
        warn!(name, location = declared, "Skipping parameter with unsupported location");
        return Ok(None);
    };

    let style = raw
        .get("style")
        .and_then(Value::as_str)
        .unwrap_or(location.default_style())
        .to_string();
    let explode = flag(raw, "explode").unwrap_or_else(|| {
        style == "form"
            || style == "deepObject"
            || raw.get("collectionFormat").and_then(Value::as_str) == Some("multi")
    });
    let allow_reserved = (location == ParameterLocation::Query)
        .then(|| flag(raw, "allowReserved").unwrap_or(false));

    let mut source = Map::new();
    if let Some(deprecated) = raw.get("deprecated") {
        source.insert("deprecated".into(), deprecated.clone());
    }
    if let Some(description) = raw.get("description") {
        source.insert("description".into(), description.clone());
    }
    if let Some(Value::Object(schema)) = parameter_schema_source(converter.version(), raw) {
        source.extend(schema);
    }
    let schema = converter.convert(&Value::Object(source), &mut SchemaState::default())?;

    Ok(Some(Parameter {
        name: name.to_string(),
        location,
        required: flag(raw, "required"),
        deprecated: flag(raw, "deprecated"),
        description: non_empty_str(raw, "description"),
        style,
        explode,
        allow_reserved,
        schema,
    }))
}

// =============================================================================
// Bodies and responses
// =============================================================================

/// 3.x request body. `None` when it declares no content.
pub fn parse_request_body(converter: &mut SchemaConverter<'_, '_>, raw: &Value) -> Result<Option<RequestBody>> {
    let body = resolve(converter, raw)?;
    let Some(content) = body.get("content").and_then(Value::as_object) else {
        return Ok(None);
    };
    let Some(media_type) = pick_media_type(content.keys().map(String::as_str)) else {
        return Ok(None);
    };
    let media_schema = content.get(media_type).and_then(|media| media.get("schema"));
    let description = body.get("description");

    let source = match (raw.get("$ref"), media_schema) {
        (Some(_), _) => wrapped_ref(description, raw),
        (None, Some(schema)) if is_ref(Some(schema)) => wrapped_ref(description, schema),
        (None, schema) => described(description, schema),
    };
    let schema = converter.convert(&source, &mut SchemaState::default())?;

    Ok(Some(RequestBody {
        media_type: Some(media_type.to_string()),
        required: flag(body, "required").filter(|required| *required),
        description: non_empty_str(body, "description"),
        schema,
    }))
}

/// 2.0 request body from `body` or `formData` parameters.
fn parse_swagger_body(
    converter: &mut SchemaConverter<'_, '_>,
    consumes: &[&str],
    body: Option<&Value>,
    form: &[&Value],
) -> Result<Option<RequestBody>> {
    if let Some(body) = body {
        let media_type = pick_media_type(consumes.iter().copied()).unwrap_or("application/json");
        let schema_raw = body.get("schema");
        let description = body.get("description");
        let source = match schema_raw {
            Some(schema) if is_ref(Some(schema)) => wrapped_ref(description, schema),
            schema => described(description, schema),
        };
        let schema = converter.convert(&source, &mut SchemaState::default())?;
        return Ok(Some(RequestBody {
            media_type: Some(media_type.to_string()),
            required: flag(body, "required").filter(|required| *required),
            description: non_empty_str(body, "description"),
            schema,
        }));
    }

    if form.is_empty() {
        return Ok(None);
    }

    let has_file = form
        .iter()
        .any(|field| field.get("type").and_then(Value::as_str) == Some("file"));
    let media_type = if has_file || consumes.contains(&"multipart/form-data") {
        "multipart/form-data"
    } else {
        "application/x-www-form-urlencoded"
    };

    let mut properties = IndexMap::new();
    let mut required = Vec::new();
    for field in form {
        let Some(name) = field.get("name").and_then(Value::as_str) else {
            continue;
        };
        let value_schema = parameter_schema_source(SpecVersion::V2_0, field);
        let source = described(field.get("description"), value_schema.as_ref());
        properties.insert(name.to_string(), converter.convert(&source, &mut SchemaState::default())?);
        if flag(field, "required") == Some(true) {
            required.push(name.to_string());
        }
    }

    let any_required = !required.is_empty();
    let schema = SchemaObject {
        properties: Some(properties),
        required: any_required.then_some(required),
        ..SchemaObject::with_type(SchemaType::Object)
    };
    Ok(Some(RequestBody {
        media_type: Some(media_type.to_string()),
        required: any_required.then_some(true),
        description: None,
        schema,
    }))
}

/// One response. `produces` only matters for 2.0.
pub fn parse_response(
    converter: &mut SchemaConverter<'_, '_>,
    status: &str,
    raw: &Value,
    produces: &[&str],
) -> Result<Response> {
    let response = resolve(converter, raw)?;
    let description = non_empty_str(response, "description");

    let content = match converter.version() {
        SpecVersion::V2_0 => response.get("schema").map(|schema| {
            let media_type = pick_media_type(produces.iter().copied()).unwrap_or("application/json");
            (media_type, Some(schema))
        }),
        SpecVersion::V3_0 | SpecVersion::V3_1 => {
            response.get("content").and_then(Value::as_object).and_then(|content| {
                let media_type = pick_media_type(content.keys().map(String::as_str))?;
                Some((media_type, content.get(media_type).and_then(|m| m.get("schema"))))
            })
        }
    };

    let Some((media_type, schema)) = content else {
        let empty = if status == "204" { SchemaType::Void } else { SchemaType::Unknown };
        return Ok(Response {
            media_type: None,
            schema: SchemaObject {
                description: description.clone(),
                ..SchemaObject::with_type(empty)
            },
            description,
        });
    };

    let source = described(response.get("description"), schema);
    let schema = converter.convert(&source, &mut SchemaState::default())?;
    Ok(Response {
        media_type: Some(media_type.to_string()),
        description,
        schema,
    })
}

// =============================================================================
// Path items
// =============================================================================

/// A path item with its `$ref` target merged underneath.
fn merged_path_item(converter: &mut SchemaConverter<'_, '_>, raw: &Value) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    if let Some(reference) = raw.get("$ref").and_then(Value::as_str) {
        if let Value::Object(target) = converter.context().resolve_ref(reference)? {
            merged.extend(target.clone());
        }
    }
    if let Value::Object(own) = raw {
        merged.extend(own.iter().filter(|(key, _)| *key != "$ref").map(|(k, v)| (k.clone(), v.clone())));
    }
    Ok(merged)
}

/// `paths` or `webhooks`, keyed as declared.
pub fn parse_path_items(
    converter: &mut SchemaConverter<'_, '_>,
    items: &Map<String, Value>,
    ids: &mut OperationIds,
) -> Result<IndexMap<String, PathItem>> {
    let mut parsed = IndexMap::new();
    for (path, raw) in items {
        let item = parse_path_item(converter, path, raw, ids)?;
        debug!(path = %path, operations = item.len(), "Parsed path item");
        parsed.insert(path.clone(), item);
    }
    Ok(parsed)
}

fn parse_path_item(
    converter: &mut SchemaConverter<'_, '_>,
    path: &str,
    raw: &Value,
    ids: &mut OperationIds,
) -> Result<PathItem> {
    let merged = Value::Object(merged_path_item(converter, raw)?);
    let shared = collect_parameters(converter, merged.get("parameters"))?;

    let mut item = PathItem::new();
    let Value::Object(members) = &merged else {
        return Ok(item);
    };
    for (key, operation) in members {
        let Ok(method) = key.parse::<HttpMethod>() else {
            continue;
        };
        let own = collect_parameters(converter, operation.get("parameters"))?;
        let parameters = ParameterSet {
            parameters: shared.parameters.clone(),
            body: shared.body,
            form: shared.form.clone(),
        }
        .inherit(own);
        let parsed = parse_operation(converter, path, method, &merged, operation, parameters, ids)?;
        item.insert(method, parsed);
    }
    Ok(item)
}

fn parse_operation(
    converter: &mut SchemaConverter<'_, '_>,
    path: &str,
    method: HttpMethod,
    path_item: &Value,
    operation: &Value,
    parameters: ParameterSet<'_>,
    ids: &mut OperationIds,
) -> Result<Operation> {
    let declared_id = operation.get("operationId").and_then(Value::as_str);
    let tags: Vec<String> = operation
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let mut ir = Operation {
        id: ids.claim(declared_id, method, path),
        method,
        path: path.to_string(),
        operation_id: declared_id.filter(|id| !id.is_empty()).map(str::to_string),
        summary: non_empty_str(operation, "summary").or_else(|| non_empty_str(path_item, "summary")),
        description: non_empty_str(operation, "description")
            .or_else(|| non_empty_str(path_item, "description")),
        deprecated: flag(operation, "deprecated"),
        tags: (!tags.is_empty()).then_some(tags),
        parameters: None,
        body: None,
        responses: None,
        extensions: extensions(operation),
    };

    let ParameterSet {
        parameters,
        body,
        form,
    } = parameters;
    if !parameters.is_empty() {
        ir.parameters = Some(parameters);
    }

    let root = converter.context().spec();
    ir.body = match converter.version() {
        SpecVersion::V2_0 => {
            let consumes = swagger_media_types(operation, root, "consumes");
            parse_swagger_body(converter, &consumes, body, &form)?
        }
        SpecVersion::V3_0 | SpecVersion::V3_1 => match operation.get("requestBody") {
            Some(request_body) => parse_request_body(converter, request_body)?,
            None => None,
        },
    };

    let mut produces = swagger_media_types(operation, root, "produces");
    if produces.is_empty() {
        produces.push("application/json");
    }
    let mut responses = IndexMap::new();
    for (status, response) in operation.get("responses").and_then(Value::as_object).into_iter().flatten() {
        if status.starts_with("x-") {
            continue;
        }
        responses.insert(status.clone(), parse_response(converter, status, response, &produces)?);
    }
    if !responses.is_empty() {
        ir.responses = Some(responses);
    }

    Ok(ir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::ir::LogicalOperator;

    fn parse_paths(version: SpecVersion, spec: &Value) -> IndexMap<String, PathItem> {
        let mut ctx = Context::new(spec);
        let mut converter = SchemaConverter::new(&mut ctx, version);
        let mut ids = OperationIds::new();
        let paths = spec["paths"].as_object().unwrap();
        parse_path_items(&mut converter, paths, &mut ids).unwrap()
    }

    #[test]
    fn test_derived_operation_ids() {
        assert_eq!(derived_operation_id(HttpMethod::Get, "/pets/{petId}/toys"), "getPetsByPetIdToys");
        assert_eq!(derived_operation_id(HttpMethod::Post, "/user-profiles"), "postUserProfiles");
        assert_eq!(derived_operation_id(HttpMethod::Get, "/"), "get");
    }

    #[test]
    fn test_operation_ids_are_unique() {
        let mut ids = OperationIds::new();
        assert_eq!(ids.claim(Some("listPets"), HttpMethod::Get, "/pets"), "listPets");
        assert_eq!(ids.claim(Some("listPets"), HttpMethod::Get, "/dogs"), "listPets2");
        assert_eq!(ids.claim(Some(""), HttpMethod::Get, "/pets"), "getPets");
        assert_eq!(ids.claim(None, HttpMethod::Get, "/pets"), "getPets2");
    }

    #[test]
    fn test_pick_media_type_prefers_json() {
        assert_eq!(
            pick_media_type(["text/plain", "application/vnd.api+json"]),
            Some("application/vnd.api+json")
        );
        assert_eq!(
            pick_media_type(["application/json; charset=utf-8"]),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(pick_media_type(["text/plain", "text/csv"]), Some("text/plain"));
        assert_eq!(pick_media_type(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_operation_parameters_override_path_item() {
        let spec = json!({
            "openapi": "3.0.3",
            "paths": { "/pets/{id}": {
                "summary": "One pet",
                "parameters": [
                    { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
                    { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
                ],
                "get": {
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }
                    ],
                    "responses": { "204": { "description": "gone" } }
                }
            } }
        });
        let paths = parse_paths(SpecVersion::V3_0, &spec);
        let get = &paths["/pets/{id}"][&HttpMethod::Get];

        assert_eq!(get.id, "getPetsById");
        assert_eq!(get.summary.as_deref(), Some("One pet"));
        let parameters = get.parameters.as_ref().unwrap();
        let id = parameters.get(ParameterLocation::Path, "id").unwrap();
        assert_eq!(id.schema.schema_type, Some(SchemaType::Integer));
        assert_eq!(id.style, "simple");
        assert!(!id.explode);
        assert!(id.allow_reserved.is_none());

        let verbose = parameters.get(ParameterLocation::Query, "verbose").unwrap();
        assert_eq!(verbose.style, "form");
        assert!(verbose.explode);
        assert_eq!(verbose.allow_reserved, Some(false));

        let gone = &get.responses.as_ref().unwrap()["204"];
        assert!(gone.media_type.is_none());
        assert_eq!(gone.schema.schema_type, Some(SchemaType::Void));
        assert_eq!(gone.schema.description.as_deref(), Some("gone"));
    }

    #[test]
    fn test_request_body_refs_are_wrapped() {
        let spec = json!({
            "openapi": "3.1.0",
            "paths": { "/pets": { "post": {
                "requestBody": {
                    "description": "new pet",
                    "required": true,
                    "content": {
                        "text/plain": { "schema": { "type": "string" } },
                        "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                    }
                },
                "responses": { "201": {
                    "description": "created",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } }
                } }
            } } },
            "components": { "schemas": { "Pet": { "type": "object" } } }
        });
        let paths = parse_paths(SpecVersion::V3_1, &spec);
        let post = &paths["/pets"][&HttpMethod::Post];

        let body = post.body.as_ref().unwrap();
        assert_eq!(body.media_type.as_deref(), Some("application/json"));
        assert_eq!(body.required, Some(true));
        assert_eq!(body.schema.reference.as_deref(), Some("#/components/schemas/Pet"));
        assert_eq!(body.schema.description.as_deref(), Some("new pet"));

        let created = &post.responses.as_ref().unwrap()["201"];
        assert_eq!(created.media_type.as_deref(), Some("application/json"));
        assert_eq!(created.schema.reference.as_deref(), Some("#/components/schemas/Pet"));
        assert_eq!(created.schema.description.as_deref(), Some("created"));
    }

    #[test]
    fn test_path_item_refs_are_merged() {
        let spec = json!({
            "openapi": "3.1.0",
            "paths": {
                "/a": { "get": { "operationId": "shared", "responses": {} } },
                "/b": { "$ref": "#/paths/~1a", "description": "alias" }
            }
        });
        let paths = parse_paths(SpecVersion::V3_1, &spec);
        let aliased = &paths["/b"][&HttpMethod::Get];
        assert_eq!(aliased.path, "/b");
        assert_eq!(aliased.id, "shared2");
        assert_eq!(aliased.description.as_deref(), Some("alias"));
    }

    #[test]
    fn test_swagger_body_parameter() {
        let spec = json!({
            "swagger": "2.0",
            "consumes": ["application/xml", "application/json"],
            "paths": { "/pets": { "post": {
                "parameters": [
                    { "name": "pet", "in": "body", "required": true, "schema": { "$ref": "#/definitions/Pet" } },
                    { "name": "limit", "in": "query", "type": "integer", "collectionFormat": "multi" }
                ],
                "responses": { "200": { "description": "ok", "schema": { "type": "array", "items": { "$ref": "#/definitions/Pet" } } } }
            } } },
            "definitions": { "Pet": { "type": "object" } }
        });
        let paths = parse_paths(SpecVersion::V2_0, &spec);
        let post = &paths["/pets"][&HttpMethod::Post];

        let body = post.body.as_ref().unwrap();
        assert_eq!(body.media_type.as_deref(), Some("application/json"));
        assert_eq!(body.schema.reference.as_deref(), Some("#/components/schemas/Pet"));
        assert_eq!(body.required, Some(true));

        let limit = post.parameters.as_ref().unwrap().get(ParameterLocation::Query, "limit").unwrap();
        assert_eq!(limit.schema.schema_type, Some(SchemaType::Integer));
        assert!(limit.explode);

        let ok = &post.responses.as_ref().unwrap()["200"];
        assert_eq!(ok.media_type.as_deref(), Some("application/json"));
        assert_eq!(ok.schema.schema_type, Some(SchemaType::Array));
        assert_eq!(
            ok.schema.items,
            Some(vec![SchemaObject::reference("#/components/schemas/Pet")])
        );
    }

    #[test]
    fn test_swagger_form_data_body() {
        let spec = json!({
            "swagger": "2.0",
            "paths": { "/upload": { "post": {
                "parameters": [
                    { "name": "file", "in": "formData", "type": "file", "required": true },
                    { "name": "note", "in": "formData", "type": "string", "description": "free text" }
                ],
                "responses": { "200": { "description": "ok" } }
            } } }
        });
        let paths = parse_paths(SpecVersion::V2_0, &spec);
        let post = &paths["/upload"][&HttpMethod::Post];

        let body = post.body.as_ref().unwrap();
        assert_eq!(body.media_type.as_deref(), Some("multipart/form-data"));
        assert_eq!(body.required, Some(true));
        let properties = body.schema.properties.as_ref().unwrap();
        assert_eq!(properties["file"].schema_type, Some(SchemaType::String));
        assert_eq!(properties["file"].format.as_deref(), Some("binary"));
        assert_eq!(properties["note"].description.as_deref(), Some("free text"));
        assert_eq!(body.schema.required, Some(vec!["file".to_string()]));

        let ok = &post.responses.as_ref().unwrap()["200"];
        assert_eq!(ok.schema.schema_type, Some(SchemaType::Unknown));
    }

    #[test]
    fn test_parameter_schema_from_content() {
        let spec = json!({ "openapi": "3.1.0" });
        let mut ctx = Context::new(&spec);
        let mut converter = SchemaConverter::new(&mut ctx, SpecVersion::V3_1);
        let raw = json!({
            "name": "filter",
            "in": "query",
            "deprecated": true,
            "content": { "application/json": { "schema": { "type": ["string", "null"] } } }
        });
        let parameter = parse_parameter(&mut converter, &raw).unwrap().unwrap();
        assert_eq!(parameter.deprecated, Some(true));
        assert_eq!(parameter.schema.deprecated, Some(true));
        assert_eq!(parameter.schema.logical_operator, Some(LogicalOperator::Or));

        let unsupported = json!({ "name": "x", "in": "matrix" });
        assert!(parse_parameter(&mut converter, &unsupported).unwrap().is_none());
    }
}
