//! # wirespec-model
//!
//! The message model: types with sizes, the directed field graph, the
//! evaluator that materialises per-field facts, and the validated-model
//! surface consumed by downstream tooling.
//!
//! ## Pipeline
//!
//! An external parser assembles a [`Specification`](ast::Specification):
//! types (including message graphs) and sessions. [`check`](model::check)
//! evaluates every message graph — computing `First`/`Last` facts and path
//! conditions per field, discharging proof obligations through the SMT
//! bridge — and validates every session, aggregating diagnostics across the
//! whole package.
//!
//! ```
//! use wirespec_base::Identifier;
//! use wirespec_model::types::Type;
//!
//! let byte = Type::modular(Identifier::new("U8").unwrap(), 256).unwrap();
//! assert_eq!(byte.size().unwrap().to_string(), "8");
//! ```

pub mod ast;
pub mod eval;
pub mod graph;
pub mod model;
pub mod types;

pub use ast::{lower_components, Component, ContextClause, Package, Specification, Then};
pub use eval::{evaluate, Facts, Field};
pub use graph::{Edge, MessageGraph, Node, NodeIndex};
pub use model::{check, ValidatedModel};
pub use types::Type;
