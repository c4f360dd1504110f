//! IR Schema Object
//!
//! One recursive struct with optional fields. The identity of a schema is
//! exactly one of `$ref`, a `type`, or a composition (`items` +
//! `logicalOperator`); [`SchemaObject::shape`] exposes that as a closed enum
//! so consumers match exhaustively instead of probing fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

// =============================================================================
// Enums
// =============================================================================

/// Primitive IR types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Array,
    Boolean,
    Enum,
    Integer,
    Never,
    Null,
    Number,
    Object,
    String,
    Tuple,
    Unknown,
    Void,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Integer => "integer",
            Self::Never => "never",
            Self::Null => "null",
            Self::Number => "number",
            Self::Object => "object",
            Self::String => "string",
            Self::Tuple => "tuple",
            Self::Unknown => "unknown",
            Self::Void => "void",
        }
    }

    /// Types whose members can be compared by signature during deduplication
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Integer
                | Self::Null
                | Self::Number
                | Self::String
                | Self::Unknown
                | Self::Void
        )
    }

    /// Types that keep a single item instead of lifting it
    pub fn holds_items(&self) -> bool {
        matches!(self, Self::Array | Self::Enum | Self::Tuple)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    #[default]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Read,
    Write,
}

// =============================================================================
// Schema Object
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SchemaObject>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,

    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<AccessScope>,

    /// Object only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaObject>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, SchemaObject>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<SchemaObject>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaObject>>,

    /// Properties to drop when this member is merged into a composition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit: Option<Vec<String>>,

    /// `x-*` vendor extensions
    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

/// Identity view of a schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaShape<'a> {
    /// No constraints at all
    Empty,
    Reference(&'a str),
    /// A primitive type; `items` may still be present for array/enum/tuple
    Typed(SchemaType),
    Composition {
        items: &'a [SchemaObject],
        operator: LogicalOperator,
    },
}

macro_rules! overlay_fields {
    ($target:ident, $source:ident; $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field;
            }
        )+
    };
}

impl SchemaObject {
    pub fn with_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self::with_type(SchemaType::Null)
    }

    pub fn unknown() -> Self {
        Self::with_type(SchemaType::Unknown)
    }

    /// `{ const, type }`
    pub fn constant(schema_type: SchemaType, value: Value) -> Self {
        Self {
            schema_type: Some(schema_type),
            const_value: Some(value),
            ..Self::default()
        }
    }

    pub fn composition(items: Vec<SchemaObject>, operator: LogicalOperator) -> Self {
        Self {
            items: Some(items),
            logical_operator: Some(operator),
            ..Self::default()
        }
    }

    pub fn shape(&self) -> SchemaShape<'_> {
        if let Some(reference) = &self.reference {
            return SchemaShape::Reference(reference);
        }
        if let Some(schema_type) = self.schema_type {
            return SchemaShape::Typed(schema_type);
        }
        match &self.items {
            Some(items) if !items.is_empty() => SchemaShape::Composition {
                items,
                operator: self.logical_operator.unwrap_or_default(),
            },
            _ => SchemaShape::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_type(&self, schema_type: SchemaType) -> bool {
        self.schema_type == Some(schema_type)
    }

    pub fn has_properties(&self) -> bool {
        self.properties.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Shallow merge: every field set on `other` replaces the one here.
    pub fn overlay(mut self, other: SchemaObject) -> SchemaObject {
        overlay_fields!(self, other;
            reference, schema_type, items, logical_operator, const_value, default,
            example, deprecated, description, title, format, minimum, maximum,
            exclusive_minimum, exclusive_maximum, min_length, max_length, min_items,
            max_items, pattern, access_scope, required, properties, pattern_properties,
            property_names, additional_properties, omit,
        );
        self.extensions.extend(other.extensions);
        self
    }

    /// Append to `required` without duplicates.
    pub fn add_required(&mut self, name: &str) {
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.iter().any(|r| r == name) {
            required.push(name.to_string());
        }
    }

    pub fn add_omit(&mut self, name: &str) {
        let omit = self.omit.get_or_insert_with(Vec::new);
        if !omit.iter().any(|o| o == name) {
            omit.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape() {
        assert_eq!(SchemaObject::default().shape(), SchemaShape::Empty);
        assert_eq!(
            SchemaObject::reference("#/components/schemas/A").shape(),
            SchemaShape::Reference("#/components/schemas/A")
        );
        assert_eq!(
            SchemaObject::with_type(SchemaType::String).shape(),
            SchemaShape::Typed(SchemaType::String)
        );

        let union = SchemaObject {
            items: Some(vec![SchemaObject::null()]),
            ..Default::default()
        };
        match union.shape() {
            SchemaShape::Composition { items, operator } => {
                assert_eq!(items.len(), 1);
                assert_eq!(operator, LogicalOperator::Or);
            }
            other => panic!("Expected composition, got {:?}", other),
        }
    }

    #[test]
    fn test_overlay_replaces_set_fields_only() {
        let base = SchemaObject {
            description: Some("base".into()),
            title: Some("Base".into()),
            ..SchemaObject::with_type(SchemaType::Object)
        };
        let top = SchemaObject {
            description: Some("top".into()),
            ..SchemaObject::reference("#/components/schemas/A")
        };
        let merged = base.overlay(top);
        assert_eq!(merged.description.as_deref(), Some("top"));
        assert_eq!(merged.title.as_deref(), Some("Base"));
        assert_eq!(merged.schema_type, Some(SchemaType::Object));
        assert_eq!(merged.reference.as_deref(), Some("#/components/schemas/A"));
    }

    #[test]
    fn test_serializes_with_ir_field_names() {
        let mut schema = SchemaObject::composition(
            vec![
                SchemaObject::reference("#/components/schemas/A"),
                SchemaObject::constant(SchemaType::String, json!("b")),
            ],
            LogicalOperator::Or,
        );
        schema.access_scope = Some(AccessScope::Read);
        schema.extensions.insert("x-internal".into(), json!(true));

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "items": [
                    { "$ref": "#/components/schemas/A" },
                    { "type": "string", "const": "b" }
                ],
                "logicalOperator": "or",
                "accessScope": "read",
                "x-internal": true
            })
        );
    }

    #[test]
    fn test_required_and_omit_do_not_duplicate() {
        let mut schema = SchemaObject::with_type(SchemaType::Object);
        schema.add_required("kind");
        schema.add_required("kind");
        schema.add_omit("kind");
        schema.add_omit("kind");
        assert_eq!(schema.required, Some(vec!["kind".to_string()]));
        assert_eq!(schema.omit, Some(vec!["kind".to_string()]));
    }
}
