//! Intermediate Representation
//!
//! Version-independent model produced from 2.0, 3.0.x and 3.1.x documents.
//! Components are keyed by decoded name, paths and webhooks by their
//! original key, every map in declaration order.

pub mod schema;
pub mod utils;

pub use schema::{AccessScope, LogicalOperator, SchemaObject, SchemaShape, SchemaType};
pub use utils::{add_items_to_schema, deduplicate_schema, flatten_intersection};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::IrError;
use crate::pointer::pointer_to_path;

// =============================================================================
// HTTP Methods
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Delete,
        HttpMethod::Get,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Patch,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Get => "get",
            Self::Head => "head",
            Self::Options => "options",
            Self::Patch => "patch",
            Self::Post => "post",
            Self::Put => "put",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| IrError::InvalidFormat(format!("unknown HTTP method '{}'", s)))
    }
}

// =============================================================================
// Model
// =============================================================================

/// Root of the IR
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<IndexMap<String, PathItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhooks: Option<IndexMap<String, PathItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<Server>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaObject>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub request_bodies: IndexMap<String, RequestBody>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,
}

/// Operations of one path, by method
pub type PathItem = IndexMap<HttpMethod, Operation>;

impl Model {
    pub fn components_mut(&mut self) -> &mut Components {
        self.components.get_or_insert_with(Components::default)
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaObject> {
        self.components.as_ref()?.schemas.get(name)
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schema(name).is_some()
    }

    /// Look up an IR `$ref` (`#/components/{kind}/{name}`) among schemas.
    pub fn resolve_schema_ref(&self, reference: &str) -> Option<&SchemaObject> {
        match pointer_to_path(reference).as_slice() {
            [components, kind, name] if components == "components" && kind == "schemas" => {
                self.schema(name)
            }
            _ => None,
        }
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.as_ref()?.get(path)?.get(&method)
    }

    /// Operations in path order, then method order as declared.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths
            .iter()
            .flat_map(|paths| paths.values())
            .flat_map(|item| item.values())
    }
}

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique across the document
    pub id: String,
    pub method: HttpMethod,
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<IndexMap<String, Response>>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Cookie,
    Header,
    Path,
    Query,
}

impl ParameterLocation {
    pub fn parse(location: &str) -> Option<Self> {
        match location {
            "cookie" => Some(Self::Cookie),
            "header" => Some(Self::Header),
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            _ => None,
        }
    }

    /// `simple` for path and header, `form` otherwise
    pub fn default_style(&self) -> &'static str {
        match self {
            Self::Header | Self::Path => "simple",
            Self::Cookie | Self::Query => "form",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub style: String,
    pub explode: bool,

    /// Query parameters only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reserved: Option<bool>,

    pub schema: SchemaObject,
}

/// Parameters grouped by location, each keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub cookie: IndexMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub header: IndexMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub path: IndexMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub query: IndexMap<String, Parameter>,
}

impl Parameters {
    fn bucket_mut(&mut self, location: ParameterLocation) -> &mut IndexMap<String, Parameter> {
        match location {
            ParameterLocation::Cookie => &mut self.cookie,
            ParameterLocation::Header => &mut self.header,
            ParameterLocation::Path => &mut self.path,
            ParameterLocation::Query => &mut self.query,
        }
    }

    pub fn get(&self, location: ParameterLocation, name: &str) -> Option<&Parameter> {
        match location {
            ParameterLocation::Cookie => self.cookie.get(name),
            ParameterLocation::Header => self.header.get(name),
            ParameterLocation::Path => self.path.get(name),
            ParameterLocation::Query => self.query.get(name),
        }
    }

    /// Insert, replacing a parameter with the same location and name.
    pub fn insert(&mut self, parameter: Parameter) {
        self.bucket_mut(parameter.location)
            .insert(parameter.name.clone(), parameter);
    }

    /// `overrides` win over what is already here.
    pub fn merge(mut self, overrides: Parameters) -> Parameters {
        for bucket in [
            overrides.cookie,
            overrides.header,
            overrides.path,
            overrides.query,
        ] {
            for (_, parameter) in bucket {
                self.insert(parameter);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.cookie.len() + self.header.len() + self.path.len() + self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub schema: SchemaObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub schema: SchemaObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
