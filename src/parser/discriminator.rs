//! Discriminator resolution
//!
//! Mapping keys are strings in the document even when the discriminator
//! property is a boolean or a number. Values are coerced here; tokens that
//! do not parse degrade to string constants with a warning.

use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::context::Context;
use crate::error::Result;
use crate::ir::{SchemaObject, SchemaType};
use crate::pointer::{canonical_ref, ref_to_name};

/// Declared type of a discriminator property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorPropertyType {
    Boolean,
    Integer,
    Number,
    #[default]
    String,
}

impl DiscriminatorPropertyType {
    fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            _ => None,
        }
    }
}

/// Borrowed view of a 3.x discriminator object
#[derive(Debug, Clone, Copy)]
pub struct Discriminator<'a> {
    pub property_name: &'a str,
    pub mapping: Option<&'a Map<String, Value>>,
}

impl<'a> Discriminator<'a> {
    /// `None` for 2.0 string discriminators or malformed objects.
    pub fn from_schema(schema: &'a Value) -> Option<Self> {
        let object = schema.get("discriminator")?.as_object()?;
        Some(Self {
            property_name: object.get("propertyName")?.as_str()?,
            mapping: object.get("mapping").and_then(Value::as_object),
        })
    }
}

/// A discriminator found while searching a schema, with the `oneOf` of the
/// schema that declared it
#[derive(Debug, Clone, Copy)]
pub struct FoundDiscriminator<'a> {
    pub discriminator: Discriminator<'a>,
    pub one_of: Option<&'a [Value]>,
}

/// Mapping keys whose target is `reference`.
///
/// Without a match the referenced component's name is used, unless
/// `use_name_fallback` says otherwise.
pub fn discriminator_values(
    reference: &str,
    mapping: Option<&Map<String, Value>>,
    use_name_fallback: Option<&dyn Fn() -> bool>,
) -> Vec<String> {
    let target = canonical_ref(reference);
    let values: Vec<String> = mapping
        .into_iter()
        .flatten()
        .filter(|(_, mapped)| mapped.as_str().is_some_and(|m| canonical_ref(m) == target))
        .map(|(key, _)| key.clone())
        .collect();

    if !values.is_empty() {
        return values;
    }
    if use_name_fallback.map_or(true, |fallback| fallback()) {
        return vec![ref_to_name(reference)];
    }
    Vec::new()
}

/// Mapping keys whose target is exactly `reference`, with no fallback.
pub fn mapped_values(reference: &str, mapping: Option<&Map<String, Value>>) -> Vec<String> {
    discriminator_values(reference, mapping, Some(&|| false))
}

/// Coerce a mapping key to the property type.
pub fn convert_discriminator_value(value: &str, property_type: DiscriminatorPropertyType) -> SchemaObject {
    match property_type {
        DiscriminatorPropertyType::Boolean => match value {
            "true" => SchemaObject::constant(SchemaType::Boolean, Value::Bool(true)),
            "false" => SchemaObject::constant(SchemaType::Boolean, Value::Bool(false)),
            other => {
                warn!(
                    value = other,
                    "Discriminator value is not a boolean, falling back to string"
                );
                string_constant(other)
            }
        },
        DiscriminatorPropertyType::Integer | DiscriminatorPropertyType::Number => {
            let schema_type = if property_type == DiscriminatorPropertyType::Integer {
                SchemaType::Integer
            } else {
                SchemaType::Number
            };
            match parse_number(value) {
                Some(number) => SchemaObject::constant(schema_type, Value::Number(number)),
                None => {
                    warn!(
                        value,
                        expected = %schema_type,
                        "Discriminator value is not numeric, falling back to string"
                    );
                    string_constant(value)
                }
            }
        }
        DiscriminatorPropertyType::String => string_constant(value),
    }
}

fn string_constant(value: &str) -> SchemaObject {
    SchemaObject::constant(SchemaType::String, Value::String(value.to_string()))
}

fn parse_number(token: &str) -> Option<Number> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Ok(integer) = token.parse::<i64>() {
        return Some(Number::from(integer));
    }
    token.parse::<f64>().ok().and_then(Number::from_f64)
}

fn resolve_if_ref<'a>(ctx: &Context<'a>, schema: &'a Value) -> Result<&'a Value> {
    match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) => ctx.resolve_ref(reference),
        None => Ok(schema),
    }
}

/// Type of `property_name` as declared in `schemas` or their `allOf`
/// chains. Defaults to string.
pub fn find_discriminator_property_type<'s>(
    ctx: &Context<'s>,
    property_name: &str,
    schemas: &'s [Value],
) -> Result<DiscriminatorPropertyType> {
    let mut visited = HashSet::new();
    property_type_in(ctx, property_name, schemas, &mut visited)
}

fn property_type_in<'s>(
    ctx: &Context<'s>,
    property_name: &str,
    schemas: &'s [Value],
    visited: &mut HashSet<String>,
) -> Result<DiscriminatorPropertyType> {
    for schema in schemas {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if !visited.insert(canonical_ref(reference)) {
                continue;
            }
        }
        let resolved = resolve_if_ref(ctx, schema)?;

        if let Some(property) = resolved
            .get("properties")
            .and_then(|properties| properties.get(property_name))
            .filter(|property| property.is_object())
        {
            let property = resolve_if_ref(ctx, property)?;
            let declared: Vec<&str> = match property.get("type") {
                Some(Value::String(single)) => vec![single.as_str()],
                Some(Value::Array(many)) => many.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            if let Some(found) = declared
                .into_iter()
                .find_map(DiscriminatorPropertyType::from_type_name)
            {
                return Ok(found);
            }
        }

        if let Some(Value::Array(all_of)) = resolved.get("allOf") {
            let found = property_type_in(ctx, property_name, all_of, visited)?;
            if found != DiscriminatorPropertyType::String {
                return Ok(found);
            }
        }
    }
    Ok(DiscriminatorPropertyType::String)
}

/// Discriminators declared on `schema` or anywhere along its `allOf`
/// chain, outermost first.
pub fn find_discriminators_in_schema<'s>(
    ctx: &Context<'s>,
    schema: &'s Value,
) -> Result<Vec<FoundDiscriminator<'s>>> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    collect_discriminators(ctx, schema, &mut found, &mut visited)?;
    Ok(found)
}

fn collect_discriminators<'s>(
    ctx: &Context<'s>,
    schema: &'s Value,
    found: &mut Vec<FoundDiscriminator<'s>>,
    visited: &mut HashSet<String>,
) -> Result<()> {
    if let Some(discriminator) = Discriminator::from_schema(schema) {
        found.push(FoundDiscriminator {
            discriminator,
            one_of: schema
                .get("oneOf")
                .and_then(Value::as_array)
                .map(Vec::as_slice),
        });
    }

    for branch in schema.get("allOf").and_then(Value::as_array).into_iter().flatten() {
        if let Some(reference) = branch.get("$ref").and_then(Value::as_str) {
            if !visited.insert(canonical_ref(reference)) {
                continue;
            }
        }
        let resolved = resolve_if_ref(ctx, branch)?;
        collect_discriminators(ctx, resolved, found, visited)?;
    }
    Ok(())
}

/// `required` of `schema` or of any of its `allOf` branches names `property`.
pub fn requires_property(ctx: &Context<'_>, schema: &Value, property: &str) -> Result<bool> {
    if lists_required(schema, property) {
        return Ok(true);
    }
    for branch in schema.get("allOf").and_then(Value::as_array).into_iter().flatten() {
        let resolved = match branch.get("$ref").and_then(Value::as_str) {
            Some(reference) => ctx.resolve_ref(reference)?,
            None => branch,
        };
        if lists_required(resolved, property) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn lists_required(schema: &Value, property: &str) -> bool {
    schema
        .get("required")
        .and_then(Value::as_array)
        .is_some_and(|required| required.iter().any(|r| r.as_str() == Some(property)))
}

/// Whether the schema behind `reference` declares `property`, directly or
/// through its `allOf` chain. Unresolvable references count as "no".
pub fn has_property_in_ref_chain(ctx: &Context<'_>, reference: &str, property: &str) -> bool {
    let mut visited = HashSet::new();
    declares_property(ctx, reference, property, &mut visited)
}

fn declares_property(
    ctx: &Context<'_>,
    reference: &str,
    property: &str,
    visited: &mut HashSet<String>,
) -> bool {
    if !visited.insert(canonical_ref(reference)) {
        return false;
    }
    let Ok(schema) = ctx.resolve_ref(reference) else {
        return false;
    };
    if schema
        .get("properties")
        .and_then(|properties| properties.get(property))
        .is_some()
    {
        return true;
    }
    schema
        .get("allOf")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|branch| match branch.get("$ref").and_then(Value::as_str) {
            Some(nested) => declares_property(ctx, nested, property, visited),
            None => branch
                .get("properties")
                .and_then(|properties| properties.get(property))
                .is_some(),
        })
}
