//! Dialect rules
//!
//! The converter runs one algorithm for every supported version. The places
//! where 2.0, 3.0.x and 3.1.x disagree are collected here.

use semver::{Version, VersionReq};
use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::error::{IrError, Result};
use crate::pointer::{encode_segment, pointer_to_path, ref_to_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2_0,
    V3_0,
    V3_1,
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V2_0 => f.write_str("2.0"),
            Self::V3_0 => f.write_str("3.0.x"),
            Self::V3_1 => f.write_str("3.1.x"),
        }
    }
}

/// `3.1` and `3` are padded so semver accepts them.
fn pad_version(raw: &str) -> String {
    let parts = raw.trim().split('.').count();
    match parts {
        1 => format!("{}.0.0", raw.trim()),
        2 => format!("{}.0", raw.trim()),
        _ => raw.trim().to_string(),
    }
}

impl SpecVersion {
    /// Pick the dialect for a document.
    ///
    /// - `swagger` present: 2.0
    /// - `openapi` in `>=3.0.0, <3.1.0`: 3.0.x
    /// - `openapi` `>=3.1.0`: 3.1.x
    pub fn detect(spec: &Value) -> Result<Self> {
        let Value::Object(root) = spec else {
            return Err(IrError::InvalidFormat("document root must be an object".into()));
        };

        if root.contains_key("swagger") {
            debug!(version = "2.0", "Detected dialect");
            return Ok(Self::V2_0);
        }

        let Some(raw) = root.get("openapi").and_then(Value::as_str) else {
            return Err(IrError::UnsupportedSpec(
                "missing `openapi` or `swagger` version field".into(),
            ));
        };

        let version = Version::parse(&pad_version(raw))?;
        let v3_0 = VersionReq::parse(">=3.0.0, <3.1.0")?;
        let v3_1 = VersionReq::parse(">=3.1.0")?;

        let dialect = if v3_0.matches(&version) {
            Self::V3_0
        } else if v3_1.matches(&version) {
            Self::V3_1
        } else {
            return Err(IrError::UnsupportedSpec(raw.to_string()));
        };
        debug!(version = raw, dialect = %dialect, "Detected dialect");
        Ok(dialect)
    }

    /// Declared types, with `properties` implying `object`.
    ///
    /// Only 3.1 allows a list in `type`.
    pub fn schema_types<'a>(&self, schema: &'a Value) -> Vec<&'a str> {
        match schema.get("type") {
            Some(Value::String(single)) => vec![single.as_str()],
            Some(Value::Array(many)) if *self == Self::V3_1 => {
                many.iter().filter_map(Value::as_str).collect()
            }
            _ if schema.get("properties").is_some() => vec!["object"],
            _ => Vec::new(),
        }
    }

    /// Whether the schema admits `null` next to its declared type.
    pub fn is_nullable(&self, schema: &Value) -> bool {
        match self {
            Self::V3_1 => self.schema_types(schema).contains(&"null"),
            Self::V3_0 => schema.get("nullable") == Some(&Value::Bool(true)),
            Self::V2_0 => schema.get("x-nullable") == Some(&Value::Bool(true)),
        }
    }

    /// `const`, `prefixItems`, `patternProperties` and friends
    pub fn has_json_schema_keywords(&self) -> bool {
        *self == Self::V3_1
    }

    /// 3.1 exclusives are numbers; older ones are flags on min/max.
    pub fn numeric_exclusives(&self) -> bool {
        *self == Self::V3_1
    }

    /// Only 3.1 lets `$ref` carry sibling keywords.
    pub fn keeps_ref_siblings(&self) -> bool {
        *self == Self::V3_1
    }

    /// Discriminator mapping keys are coerced to the property type.
    pub fn coerces_discriminator_values(&self) -> bool {
        *self == Self::V3_1
    }

    /// Composition keywords that get lifted out of array `items`.
    pub fn item_composition_keys(&self) -> &'static [&'static str] {
        match self {
            Self::V2_0 => &["allOf"],
            Self::V3_0 | Self::V3_1 => &["allOf", "anyOf", "oneOf"],
        }
    }

    /// Container of reusable schemas.
    pub fn schemas_pointer(&self) -> &'static str {
        match self {
            Self::V2_0 => "#/definitions",
            Self::V3_0 | Self::V3_1 => "#/components/schemas",
        }
    }

    /// IR `$ref` for a document reference; 2.0 definitions move under
    /// `components/schemas`.
    pub fn ir_ref(&self, reference: &str) -> String {
        if *self == Self::V2_0 {
            let path = pointer_to_path(reference);
            if path.len() == 2 && path[0] == "definitions" {
                return format!("#/components/schemas/{}", encode_segment(&ref_to_name(reference)));
            }
        }
        reference.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_versions() {
        assert_eq!(SpecVersion::detect(&json!({ "swagger": "2.0" })).unwrap(), SpecVersion::V2_0);
        assert_eq!(SpecVersion::detect(&json!({ "openapi": "3.0.3" })).unwrap(), SpecVersion::V3_0);
        assert_eq!(SpecVersion::detect(&json!({ "openapi": "3.1.0" })).unwrap(), SpecVersion::V3_1);
        assert_eq!(SpecVersion::detect(&json!({ "openapi": "3.1" })).unwrap(), SpecVersion::V3_1);
        assert_eq!(SpecVersion::detect(&json!({ "openapi": "3.2.0" })).unwrap(), SpecVersion::V3_1);
    }

    #[test]
    fn test_detect_rejects_unknown_versions() {
        match SpecVersion::detect(&json!({ "openapi": "2.5.0" })) {
            Err(err @ IrError::UnsupportedSpec(_)) => {
                assert_eq!(err.to_string(), "Unsupported OpenAPI specification: 2.5.0")
            }
            other => panic!("Expected UnsupportedSpec, got {:?}", other),
        }
        assert!(matches!(
            SpecVersion::detect(&json!({ "info": {} })),
            Err(IrError::UnsupportedSpec(_))
        ));
        assert!(matches!(
            SpecVersion::detect(&json!([])),
            Err(IrError::InvalidFormat(_))
        ));
        assert!(matches!(
            SpecVersion::detect(&json!({ "openapi": "three" })),
            Err(IrError::Semver(_))
        ));
    }

    #[test]
    fn test_schema_types() {
        let v31 = SpecVersion::V3_1;
        let v30 = SpecVersion::V3_0;
        assert_eq!(v31.schema_types(&json!({ "type": "string" })), vec!["string"]);
        assert_eq!(
            v31.schema_types(&json!({ "type": ["string", "null"] })),
            vec!["string", "null"]
        );
        assert!(v30.schema_types(&json!({ "type": ["string", "null"] })).is_empty());
        assert_eq!(v30.schema_types(&json!({ "properties": {} })), vec!["object"]);
        assert!(v30.schema_types(&json!({ "description": "x" })).is_empty());
    }

    #[test]
    fn test_nullability_per_dialect() {
        let schema = json!({ "type": ["integer", "null"], "nullable": true, "x-nullable": true });
        assert!(SpecVersion::V3_1.is_nullable(&schema));
        assert!(SpecVersion::V3_0.is_nullable(&schema));
        assert!(SpecVersion::V2_0.is_nullable(&schema));

        let plain = json!({ "type": "integer" });
        assert!(!SpecVersion::V3_1.is_nullable(&plain));
        assert!(!SpecVersion::V3_0.is_nullable(&plain));
        assert!(!SpecVersion::V2_0.is_nullable(&json!({ "nullable": true })));
    }

    #[test]
    fn test_ir_ref_rewrites_definitions() {
        assert_eq!(
            SpecVersion::V2_0.ir_ref("#/definitions/Pet"),
            "#/components/schemas/Pet"
        );
        assert_eq!(
            SpecVersion::V2_0.ir_ref("#/definitions/Pet/properties/id"),
            "#/definitions/Pet/properties/id"
        );
        assert_eq!(
            SpecVersion::V3_0.ir_ref("#/components/schemas/Pet"),
            "#/components/schemas/Pet"
        );
    }
}
