//! Schema conversion
//!
//! Raw JSON Schema, in any supported dialect, to [`SchemaObject`].
//!
//! Dispatch order: `$ref`, `enum`, `allOf`, `anyOf`, `oneOf`, then
//! `type`/`properties`, then `unknown`. Named components reached through a
//! `$ref` are converted once and registered on the context as a side effect.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use tracing::{trace, warn};

use super::dialect::SpecVersion;
use super::discriminator::{
    convert_discriminator_value, discriminator_values, find_discriminator_property_type,
    find_discriminators_in_schema, has_property_in_ref_chain, mapped_values, requires_property,
    DiscriminatorPropertyType, Discriminator,
};
use crate::context::Context;
use crate::error::Result;
use crate::ir::{
    add_items_to_schema, AccessScope, LogicalOperator, SchemaObject, SchemaType,
};
use crate::pointer::{canonical_ref, is_top_level_component, pointer_to_path, ref_to_name};

// =============================================================================
// State
// =============================================================================

/// Threaded through every recursive call.
#[derive(Debug, Clone, Default)]
pub struct SchemaState {
    /// Component currently being converted, canonical form
    pub reference: Option<String>,
    /// References whose conversion is in progress further up the stack
    pub tracker: HashSet<String>,
    /// Set while converting inline `allOf` branches
    pub in_all_of: bool,
}

impl SchemaState {
    pub fn for_component(reference: &str) -> Self {
        Self {
            reference: Some(canonical_ref(reference)),
            ..Self::default()
        }
    }
}

/// Convert one schema with a fresh or caller-provided state.
pub fn schema_to_ir(
    ctx: &mut Context<'_>,
    version: SpecVersion,
    schema: &Value,
    state: Option<&mut SchemaState>,
) -> Result<SchemaObject> {
    let mut converter = SchemaConverter::new(ctx, version);
    match state {
        Some(state) => converter.convert(schema, state),
        None => converter.convert(schema, &mut SchemaState::default()),
    }
}

// =============================================================================
// Raw schema helpers
// =============================================================================

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_str(schema: &Value, key: &str) -> Option<String> {
    schema
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(schema: &Value, key: &str) -> Option<Number> {
    match schema.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

fn count(schema: &Value, key: &str) -> Option<u64> {
    schema.get(key).and_then(Value::as_u64)
}

fn is_flag(schema: &Value, key: &str) -> bool {
    schema.get(key) == Some(&Value::Bool(true))
}

fn string_list(schema: &Value, key: &str) -> Vec<String> {
    schema
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Copy of `schema` with `type` replaced.
fn with_type_override(schema: &Value, schema_type: &str) -> Value {
    let mut copy = match schema {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    copy.insert("type".into(), Value::String(schema_type.into()));
    Value::Object(copy)
}

/// Documentation fields and `x-*` extensions.
fn init_ir(schema: &Value) -> SchemaObject {
    let mut ir = SchemaObject {
        deprecated: schema.get("deprecated").and_then(Value::as_bool),
        example: schema.get("example").filter(|e| is_truthy(e)).cloned(),
        description: non_empty_str(schema, "description"),
        title: non_empty_str(schema, "title"),
        ..SchemaObject::default()
    };
    if let Value::Object(map) = schema {
        for (key, value) in map {
            if key.starts_with("x-") {
                ir.extensions.insert(key.clone(), value.clone());
            }
        }
    }
    ir
}

fn single_property(name: &str, schema: SchemaObject) -> IndexMap<String, SchemaObject> {
    let mut properties = IndexMap::new();
    properties.insert(name.to_string(), schema);
    properties
}

/// One constant, or a union of them.
fn discriminator_property(values: &[String], property_type: DiscriminatorPropertyType) -> SchemaObject {
    let mut schemas: Vec<SchemaObject> = values
        .iter()
        .map(|value| convert_discriminator_value(value, property_type))
        .collect();
    if schemas.len() > 1 {
        return SchemaObject::composition(schemas, LogicalOperator::Or);
    }
    schemas.pop().unwrap_or_default()
}

/// `#/components/schemas/{name}` or `#/definitions/{name}`
fn is_schema_component(reference: &str) -> bool {
    let path = pointer_to_path(reference);
    match path.as_slice() {
        [components, kind, _] => components == "components" && kind == "schemas",
        [definitions, _] => definitions == "definitions",
        _ => false,
    }
}

/// Longest fixed-length array expanded into tuple members.
const MAX_TUPLE_EXPANSION: u64 = 100;

struct PendingDiscriminator<'a> {
    discriminator: Discriminator<'a>,
    is_required: bool,
    values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnionKind {
    AnyOf,
    OneOf,
}

// =============================================================================
// Converter
// =============================================================================

pub struct SchemaConverter<'c, 's> {
    ctx: &'c mut Context<'s>,
    version: SpecVersion,
}

impl<'c, 's> SchemaConverter<'c, 's> {
    pub fn new(ctx: &'c mut Context<'s>, version: SpecVersion) -> Self {
        Self { ctx, version }
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    pub fn context(&mut self) -> &mut Context<'s> {
        &mut *self.ctx
    }

    /// Convert the component behind `reference` and register it under its
    /// decoded name, unless it is registered already.
    pub fn register_component(&mut self, reference: &str) -> Result<()> {
        self.register(&canonical_ref(reference), &SchemaState::default())
    }

    pub fn convert(&mut self, schema: &Value, state: &mut SchemaState) -> Result<SchemaObject> {
        if let Some(reference) = &state.reference {
            if !state.tracker.contains(reference) {
                state.tracker.insert(reference.clone());
            }
        }

        match schema {
            Value::Object(_) => {}
            Value::Bool(false) => return Ok(SchemaObject::with_type(SchemaType::Never)),
            _ => return Ok(SchemaObject::unknown()),
        }

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            return self.parse_ref(reference, schema, state);
        }
        if let Some(Value::Array(values)) = schema.get("enum") {
            return self.parse_enum(schema, values, state);
        }
        if let Some(Value::Array(branches)) = schema.get("allOf") {
            return self.parse_all_of(schema, branches, state);
        }
        if let Some(Value::Array(branches)) = schema.get("anyOf") {
            return self.parse_union(schema, branches, UnionKind::AnyOf, state);
        }
        if let Some(Value::Array(branches)) = schema.get("oneOf") {
            return self.parse_union(schema, branches, UnionKind::OneOf, state);
        }
        if schema.get("type").is_some() || schema.get("properties").is_some() {
            return self.parse_type(schema, state);
        }
        Ok(self.parse_unknown(schema, None))
    }

    // -------------------------------------------------------------------------
    // Metadata
    // -------------------------------------------------------------------------

    fn apply_meta(&self, ir: &mut SchemaObject, schema: &Value) {
        if self.version.has_json_schema_keywords() {
            if let Some(constant) = schema.get("const") {
                ir.const_value = Some(constant.clone());
                if schema.get("type").is_none() {
                    let inferred = match constant {
                        Value::Null => Some(SchemaType::Null),
                        Value::Number(_) => Some(SchemaType::Number),
                        Value::Bool(_) => Some(SchemaType::Boolean),
                        Value::String(_) => Some(SchemaType::String),
                        _ => None,
                    };
                    if inferred.is_some() {
                        ir.schema_type = inferred;
                    }
                }
            }
        }

        if let Some(default) = schema.get("default") {
            ir.default = Some(default.clone());
        }

        if self.version.numeric_exclusives() {
            if let Some(n) = number(schema, "exclusiveMaximum") {
                ir.exclusive_maximum = Some(n);
            }
            if let Some(n) = number(schema, "exclusiveMinimum") {
                ir.exclusive_minimum = Some(n);
            }
            if let Some(n) = number(schema, "maximum") {
                ir.maximum = Some(n);
            }
            if let Some(n) = number(schema, "minimum") {
                ir.minimum = Some(n);
            }
        } else {
            let maximum = number(schema, "maximum");
            if schema.get("exclusiveMaximum").is_some_and(is_truthy) {
                if maximum.is_some() {
                    ir.exclusive_maximum = maximum;
                }
            } else if maximum.is_some() {
                ir.maximum = maximum;
            }

            let minimum = number(schema, "minimum");
            if schema.get("exclusiveMinimum").is_some_and(is_truthy) {
                if minimum.is_some() {
                    ir.exclusive_minimum = minimum;
                }
            } else if minimum.is_some() {
                ir.minimum = minimum;
            }
        }

        if let Some(format) = non_empty_str(schema, "format") {
            ir.format = Some(format);
        }
        if let Some(n) = count(schema, "maxItems") {
            ir.max_items = Some(n);
        }
        if let Some(n) = count(schema, "maxLength") {
            ir.max_length = Some(n);
        }
        if let Some(n) = count(schema, "minItems") {
            ir.min_items = Some(n);
        }
        if let Some(n) = count(schema, "minLength") {
            ir.min_length = Some(n);
        }
        if let Some(pattern) = non_empty_str(schema, "pattern") {
            ir.pattern = Some(pattern);
        }

        if is_flag(schema, "readOnly") {
            ir.access_scope = Some(AccessScope::Read);
        } else if is_flag(schema, "writeOnly") {
            ir.access_scope = Some(AccessScope::Write);
        }
    }

    // -------------------------------------------------------------------------
    // References
    // -------------------------------------------------------------------------

    fn parse_ref(&mut self, reference: &str, schema: &Value, state: &mut SchemaState) -> Result<SchemaObject> {
        let canonical = canonical_ref(reference);

        // deep pointers have no registered component: inline them
        if !is_top_level_component(&canonical) && !state.tracker.contains(&canonical) {
            let target = self.ctx.resolve_ref(reference)?;
            let previous = state.reference.replace(canonical.clone());
            state.tracker.insert(canonical.clone());
            let result = self.convert(target, state);
            state.tracker.remove(&canonical);
            state.reference = previous;
            return result;
        }

        let reference_ir = SchemaObject::reference(self.version.ir_ref(&canonical));

        if !state.tracker.contains(&canonical) {
            self.register(&canonical, state)?;
        } else {
            trace!(reference = %canonical, "Circular reference kept as $ref");
        }

        if !self.version.keeps_ref_siblings() {
            return Ok(reference_ir);
        }

        let mut ir = init_ir(schema);
        self.apply_meta(&mut ir, schema);
        let mut items = vec![reference_ir];
        if let Some(Value::Array(types)) = schema.get("type") {
            if types.iter().any(|t| t.as_str() == Some("null")) {
                items.push(SchemaObject::null());
            }
        }
        Ok(add_items_to_schema(ir, items, LogicalOperator::Or, true))
    }

    fn register(&mut self, canonical: &str, state: &SchemaState) -> Result<()> {
        if !is_schema_component(canonical) {
            return Ok(());
        }
        let name = ref_to_name(canonical);
        if self.ctx.ir.has_schema(&name) {
            return Ok(());
        }

        let target = self.ctx.resolve_ref(canonical)?;
        let mut fresh = SchemaState {
            reference: Some(canonical.to_string()),
            tracker: state.tracker.clone(),
            in_all_of: false,
        };
        let ir = self.convert(target, &mut fresh)?;
        trace!(name = %name, "Registered schema component");
        self.ctx
            .ir
            .components_mut()
            .schemas
            .entry(name)
            .or_insert(ir);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Enums
    // -------------------------------------------------------------------------

    fn parse_enum(&mut self, schema: &Value, values: &[Value], state: &mut SchemaState) -> Result<SchemaObject> {
        let mut ir = init_ir(schema);
        ir.schema_type = Some(SchemaType::Enum);

        let nullable = self.version.is_nullable(schema);
        let descriptions = schema.get("x-enum-descriptions").and_then(Value::as_array);
        let varnames = schema.get("x-enum-varnames").and_then(Value::as_array);
        let enum_names = schema.get("x-enumNames").and_then(Value::as_array);

        let mut items = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            let member_type = match value {
                Value::String(_) => "string",
                Value::Number(_) => "number",
                Value::Bool(_) => "boolean",
                Value::Array(_) => "array",
                Value::Null if nullable => "null",
                Value::Null => {
                    warn!(index, "Skipping null enum member of a non-nullable schema");
                    continue;
                }
                Value::Object(_) => {
                    warn!(index, value = %value, "Unhandled enum member type");
                    continue;
                }
            };

            let mut raw = Map::new();
            raw.insert("type".into(), Value::String(member_type.into()));
            if let Some(description) = descriptions.and_then(|d| d.get(index)).filter(|d| !d.is_null()) {
                raw.insert("description".into(), description.clone());
            }
            let title = varnames
                .and_then(|names| names.get(index))
                .filter(|name| !name.is_null())
                .or_else(|| enum_names.and_then(|names| names.get(index)));
            if let Some(title) = title {
                raw.insert("title".into(), title.clone());
            }

            let mut member = self.parse_one_type(&Value::Object(raw), member_type, None, state)?;
            member.const_value = Some(value.clone());
            if member.is_type(SchemaType::Array) {
                member.schema_type = Some(SchemaType::Tuple);
            }
            items.push(member);
        }

        Ok(add_items_to_schema(ir, items, LogicalOperator::Or, false))
    }

    // -------------------------------------------------------------------------
    // Compositions
    // -------------------------------------------------------------------------

    fn parse_all_of(&mut self, schema: &Value, branches: &[Value], state: &mut SchemaState) -> Result<SchemaObject> {
        let mut ir = init_ir(schema);
        if self.version.has_json_schema_keywords() {
            self.apply_meta(&mut ir, schema);
        }

        let parent_required = string_list(schema, "required");
        let mut items: Vec<SchemaObject> = Vec::with_capacity(branches.len() + 1);
        let mut pending: Vec<PendingDiscriminator<'s>> = Vec::new();
        let mut added: HashSet<String> = HashSet::new();

        for branch in branches {
            let branch_ref = branch.get("$ref").and_then(Value::as_str);

            let previous = state.in_all_of;
            if branch_ref.is_none() {
                state.in_all_of = true;
            }
            let converted = self.convert(branch, state);
            state.in_all_of = previous;
            let mut branch_ir = converted?;

            for name in &parent_required {
                branch_ir.add_required(name);
            }
            items.push(branch_ir);

            let (Some(branch_ref), Some(current)) = (branch_ref, state.reference.clone()) else {
                continue;
            };
            let target: &'s Value = self.ctx.resolve_ref(branch_ref)?;

            if self.version == SpecVersion::V2_0 {
                if let Some(property) = target.get("discriminator").and_then(Value::as_str) {
                    let mut tag = SchemaObject {
                        properties: Some(single_property(
                            property,
                            SchemaObject::constant(SchemaType::String, Value::String(ref_to_name(&current))),
                        )),
                        ..SchemaObject::with_type(SchemaType::Object)
                    };
                    if string_list(target, "required").iter().any(|r| r == property) {
                        tag.required = Some(vec![property.to_string()]);
                    }
                    items.push(tag);
                }
                continue;
            }

            let found = find_discriminators_in_schema(self.ctx, target)?;
            for candidate in &found {
                let name = candidate.discriminator.property_name;
                if added.contains(name) {
                    continue;
                }
                // a parent with `oneOf` only names children it lists
                let listed = candidate.one_of.map_or(true, |one_of| {
                    one_of.iter().any(|option| {
                        option
                            .get("$ref")
                            .and_then(Value::as_str)
                            .is_some_and(|r| canonical_ref(r) == current)
                    })
                });
                let values = discriminator_values(&current, candidate.discriminator.mapping, Some(&|| listed));
                if values.is_empty() {
                    continue;
                }
                let is_required = requires_property(self.ctx, target, name)?;
                pending.push(PendingDiscriminator {
                    discriminator: candidate.discriminator,
                    is_required,
                    values,
                });
                added.insert(name.to_string());
            }
        }

        for PendingDiscriminator {
            discriminator,
            is_required,
            values,
        } in pending
        {
            let name = discriminator.property_name;
            let current = state.reference.clone().unwrap_or_default();
            let own = mapped_values(&current, discriminator.mapping);
            let final_values = if own.is_empty() { values } else { own };

            let property_type = if self.version.coerces_discriminator_values() {
                find_discriminator_property_type(self.ctx, name, branches)?
            } else {
                DiscriminatorPropertyType::String
            };
            let property = discriminator_property(&final_values, property_type);

            for item in items.iter_mut() {
                let Some(reference) = item.reference.clone() else {
                    continue;
                };
                if has_property_in_ref_chain(self.ctx, &reference, name) {
                    item.add_omit(name);
                }
            }

            let inline = items
                .iter_mut()
                .rev()
                .find(|item| item.is_type(SchemaType::Object) || item.properties.is_some());
            match inline {
                Some(target) => {
                    target
                        .properties
                        .get_or_insert_with(IndexMap::new)
                        .insert(name.to_string(), property);
                    if is_required {
                        target.add_required(name);
                    }
                }
                None => {
                    let mut tag = SchemaObject {
                        properties: Some(single_property(name, property)),
                        ..SchemaObject::with_type(SchemaType::Object)
                    };
                    if is_required {
                        tag.required = Some(vec![name.to_string()]);
                    }
                    items.push(tag);
                }
            }
        }

        if self.version.schema_types(schema).contains(&"object") {
            let object_schema = with_type_override(schema, "object");
            let mut object_ir = self.parse_one_type(&object_schema, "object", None, state)?;
            if object_ir.has_properties() {
                for required in object_ir.required.clone().unwrap_or_default() {
                    let present = object_ir
                        .properties
                        .as_ref()
                        .is_some_and(|p| p.contains_key(&required));
                    if present {
                        continue;
                    }
                    if let Some(found) = self.find_branch_property(branches, &required, state)? {
                        object_ir
                            .properties
                            .get_or_insert_with(IndexMap::new)
                            .insert(required, found);
                    }
                }
                items.push(object_ir);
            }
        }

        let had_items = !items.is_empty();
        let ir = add_items_to_schema(ir, items, LogicalOperator::And, true);

        if !self.version.is_nullable(schema) {
            return Ok(ir);
        }
        // an intersection with null is empty; nest instead
        let mut nested = Vec::with_capacity(2);
        let carried = (ir.deprecated, ir.description.clone());
        if had_items {
            nested.push(ir);
        }
        nested.push(SchemaObject::null());
        let mut wrapper = add_items_to_schema(SchemaObject::default(), nested, LogicalOperator::Or, true);
        if had_items && wrapper.items.is_some() {
            wrapper.deprecated = carried.0;
            wrapper.description = carried.1;
        }
        Ok(wrapper)
    }

    /// First object branch of an `allOf` that declares `property`.
    fn find_branch_property(
        &mut self,
        branches: &[Value],
        property: &str,
        state: &mut SchemaState,
    ) -> Result<Option<SchemaObject>> {
        for branch in branches {
            let resolved = match branch.get("$ref").and_then(Value::as_str) {
                Some(reference) => self.ctx.resolve_ref(reference)?,
                None => branch,
            };
            if !self.version.schema_types(resolved).contains(&"object") {
                continue;
            }
            let object_schema = with_type_override(resolved, "object");
            let branch_ir = self.parse_one_type(&object_schema, "object", None, state)?;
            if let Some(found) = branch_ir
                .properties
                .and_then(|mut properties| properties.shift_remove(property))
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn parse_union(
        &mut self,
        schema: &Value,
        branches: &[Value],
        kind: UnionKind,
        state: &mut SchemaState,
    ) -> Result<SchemaObject> {
        let mut ir = init_ir(schema);
        if self.version.has_json_schema_keywords() {
            self.apply_meta(&mut ir, schema);
        }

        let discriminator = Discriminator::from_schema(schema);
        let property_type = match discriminator {
            Some(d) if self.version.coerces_discriminator_values() => {
                find_discriminator_property_type(self.ctx, d.property_name, branches)?
            }
            _ => DiscriminatorPropertyType::String,
        };

        let mut items: Vec<SchemaObject> = Vec::with_capacity(branches.len() + 1);
        for branch in branches {
            let mut branch_ir = self.convert(branch, state)?;

            if let (Some(discriminator), Some(reference)) = (discriminator, branch_ir.reference.clone()) {
                let values = discriminator_values(&reference, discriminator.mapping, None);
                let mut tag = SchemaObject {
                    properties: Some(single_property(
                        discriminator.property_name,
                        discriminator_property(&values, property_type),
                    )),
                    ..SchemaObject::with_type(SchemaType::Object)
                };
                if kind == UnionKind::OneOf {
                    tag.required = Some(vec![discriminator.property_name.to_string()]);
                }
                branch_ir = SchemaObject::composition(vec![tag, branch_ir], LogicalOperator::And);
            }

            let nested_union = kind == UnionKind::OneOf
                && branch_ir.logical_operator == Some(LogicalOperator::Or)
                && !branch_ir.is_type(SchemaType::Array);
            match branch_ir.items.take() {
                Some(nested) if nested_union => items.extend(nested),
                nested => {
                    branch_ir.items = nested;
                    items.push(branch_ir);
                }
            }
        }

        if self.version.is_nullable(schema) {
            items.push(SchemaObject::null());
        }

        let mut ir = add_items_to_schema(ir, items, LogicalOperator::Or, true);

        if self.version.schema_types(schema).contains(&"object") {
            let object_schema = with_type_override(schema, "object");
            let object_ir = self.parse_one_type(&object_schema, "object", None, state)?;
            if object_ir.has_properties() {
                ir = SchemaObject::composition(vec![ir, object_ir], LogicalOperator::And);
            }
        }
        Ok(ir)
    }

    // -------------------------------------------------------------------------
    // Types
    // -------------------------------------------------------------------------

    fn parse_type(&mut self, schema: &Value, state: &mut SchemaState) -> Result<SchemaObject> {
        let mut ir = init_ir(schema);
        self.apply_meta(&mut ir, schema);
        let types = self.version.schema_types(schema);

        if self.version == SpecVersion::V3_1 {
            return match types.as_slice() {
                [single] => self.parse_one_type(schema, single, Some(ir), state),
                many => self.parse_many_types(schema, many, ir, state),
            };
        }

        let Some(single) = types.first() else {
            return Ok(ir);
        };
        if self.version.is_nullable(schema) {
            return self.parse_nullable_type(schema, single, ir, state);
        }
        self.parse_one_type(schema, single, Some(ir), state)
    }

    /// Metadata for members of a type union; a `null` default stays on the
    /// union only.
    fn member_meta(&self, schema: &Value) -> SchemaObject {
        let mut meta = SchemaObject::default();
        self.apply_meta(&mut meta, schema);
        if meta.default == Some(Value::Null) {
            meta.default = None;
        }
        meta
    }

    fn parse_many_types(
        &mut self,
        schema: &Value,
        types: &[&str],
        ir: SchemaObject,
        state: &mut SchemaState,
    ) -> Result<SchemaObject> {
        let meta = if types.contains(&"null") {
            self.member_meta(schema)
        } else {
            let mut meta = SchemaObject::default();
            self.apply_meta(&mut meta, schema);
            meta
        };

        let mut items = Vec::with_capacity(types.len());
        for schema_type in types {
            if *schema_type == "null" {
                items.push(SchemaObject::null());
            } else {
                items.push(self.parse_one_type(schema, schema_type, Some(meta.clone()), state)?);
            }
        }
        Ok(add_items_to_schema(ir, items, LogicalOperator::Or, false))
    }

    fn parse_nullable_type(
        &mut self,
        schema: &Value,
        schema_type: &str,
        ir: SchemaObject,
        state: &mut SchemaState,
    ) -> Result<SchemaObject> {
        let meta = self.member_meta(schema);
        let items = vec![
            self.parse_one_type(schema, schema_type, Some(meta), state)?,
            SchemaObject::null(),
        ];
        Ok(add_items_to_schema(ir, items, LogicalOperator::Or, false))
    }

    fn parse_one_type(
        &mut self,
        schema: &Value,
        schema_type: &str,
        ir: Option<SchemaObject>,
        state: &mut SchemaState,
    ) -> Result<SchemaObject> {
        let mut ir = match ir {
            Some(ir) => ir,
            None => {
                let mut ir = init_ir(schema);
                self.apply_meta(&mut ir, schema);
                ir
            }
        };

        let primitive = match schema_type {
            "array" => return self.parse_array(schema, ir, state),
            "object" => return self.parse_object(schema, ir, state),
            "boolean" => SchemaType::Boolean,
            "integer" => SchemaType::Integer,
            "number" => SchemaType::Number,
            "null" => SchemaType::Null,
            "string" => SchemaType::String,
            _ => return Ok(self.parse_unknown(schema, Some(ir))),
        };
        ir.schema_type = Some(primitive);
        Ok(ir)
    }

    fn parse_array(&mut self, schema: &Value, mut ir: SchemaObject, state: &mut SchemaState) -> Result<SchemaObject> {
        let json_schema = self.version.has_json_schema_keywords();
        let max_items = count(schema, "maxItems");
        // past the limit the bounds stay as `minItems`/`maxItems` on a plain array
        let fixed_length = max_items.is_some_and(|max| {
            max > 0 && max <= MAX_TUPLE_EXPANSION && Some(max) == count(schema, "minItems")
        });
        let prefix_items = schema
            .get("prefixItems")
            .and_then(Value::as_array)
            .filter(|_| json_schema);

        let is_tuple = prefix_items.is_some_and(|p| !p.is_empty())
            || fixed_length
            || (json_schema && schema.get("const").is_some());
        ir.schema_type = Some(if is_tuple { SchemaType::Tuple } else { SchemaType::Array });

        let mut items = Vec::new();
        for item in prefix_items.into_iter().flatten() {
            items.push(self.convert(item, state)?);
        }

        if let Some(item_schema) = schema.get("items") {
            let item_ir = self.convert(item_schema, state)?;

            if items.is_empty() && fixed_length {
                let length = max_items.unwrap_or_default() as usize;
                items = vec![item_ir; length];
            } else {
                let opaque_ref = !self.version.keeps_ref_siblings() && item_schema.get("$ref").is_some();
                let branch_count = self
                    .version
                    .item_composition_keys()
                    .iter()
                    .find_map(|key| item_schema.get(*key).and_then(Value::as_array))
                    .map_or(0, Vec::len);

                // lift the composition so the array does not nest it twice
                if !opaque_ref && branch_count > 1 && !self.version.is_nullable(item_schema) {
                    ir = ir.overlay(item_ir);
                } else {
                    items.push(item_ir);
                }
            }
        }

        Ok(add_items_to_schema(ir, items, LogicalOperator::Or, false))
    }

    fn parse_object(&mut self, schema: &Value, mut ir: SchemaObject, state: &mut SchemaState) -> Result<SchemaObject> {
        ir.schema_type = Some(SchemaType::Object);

        let raw_properties = schema.get("properties").and_then(Value::as_object);
        let mut properties = IndexMap::new();
        for (name, property) in raw_properties.into_iter().flatten() {
            if property.is_boolean() {
                continue;
            }
            properties.insert(name.clone(), self.convert(property, state)?);
        }
        if !properties.is_empty() {
            ir.properties = Some(properties);
        }

        let raw_patterns = schema
            .get("patternProperties")
            .and_then(Value::as_object)
            .filter(|_| self.version.has_json_schema_keywords());

        match schema.get("additionalProperties") {
            None => {
                if ir.properties.is_none() {
                    ir.additional_properties = Some(Box::new(SchemaObject::unknown()));
                }
            }
            Some(Value::Bool(allowed)) => {
                // an empty closed branch would erase what sibling branches declare
                let empty_branch = state.in_all_of
                    && !allowed
                    && raw_properties.map_or(true, Map::is_empty)
                    && raw_patterns.map_or(true, Map::is_empty);
                if !empty_branch {
                    let schema_type = if *allowed { SchemaType::Unknown } else { SchemaType::Never };
                    ir.additional_properties = Some(Box::new(SchemaObject::with_type(schema_type)));
                }
            }
            Some(additional) => {
                ir.additional_properties = Some(Box::new(self.convert(additional, state)?));
            }
        }

        if let Some(patterns) = raw_patterns {
            let mut pattern_properties = IndexMap::new();
            for (pattern, pattern_schema) in patterns {
                pattern_properties.insert(pattern.clone(), self.convert(pattern_schema, state)?);
            }
            if !pattern_properties.is_empty() {
                ir.pattern_properties = Some(pattern_properties);
            }
        }

        if self.version.has_json_schema_keywords() {
            if let Some(names) = schema.get("propertyNames") {
                ir.property_names = Some(Box::new(self.convert(names, state)?));
            }
        }

        let required = string_list(schema, "required");
        if !required.is_empty() {
            ir.required = Some(required);
        }
        Ok(ir)
    }

    fn parse_unknown(&self, schema: &Value, ir: Option<SchemaObject>) -> SchemaObject {
        let mut ir = ir.unwrap_or_else(|| init_ir(schema));
        ir.schema_type = Some(SchemaType::Unknown);
        self.apply_meta(&mut ir, schema);
        ir
    }
}
