//! OpenAPI Intermediate Representation
//!
//! Turns OpenAPI 2.0, 3.0.x and 3.1.x documents into one version-independent
//! model that code generators can consume without caring which dialect the
//! input was written in.
//!
//! ## Features
//!
//! - **Dependency Graph**: every node of the document keyed by JSON Pointer, with
//!   direct, subtree and transitive `$ref` edges
//! - **Topological Walk**: dependencies first, stable declaration order, cycles
//!   included rather than dropped
//! - **Schema Conversion**: compositions, nullability, tuples, enums and
//!   discriminators normalised across dialects
//! - **Hooks**: pluggable pointer classification and priority
//!
//! ## Architecture
//!
//! ```text
//! raw document ──► graph::build_graph ──► graph::walk
//!      │
//!      └──► parser::parse_spec ──► ir::Model
//!                 │
//!                 ├── parser::schema          (schema -> SchemaObject)
//!                 ├── parser::discriminator   (mapping values, coercion)
//!                 └── parser::operation       (paths, webhooks, bodies)
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod ir;
pub mod parser;
pub mod pointer;

pub use config::IrConfig;
pub use context::{Context, HookLayer, WalkEvent};
pub use error::{IrError, Result};
pub use graph::{build_graph, walk, Graph, GroupKind, WalkOptions, WalkOrder};
pub use ir::{Model, SchemaObject};
pub use parser::{parse_spec, SpecVersion};
