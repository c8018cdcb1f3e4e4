//! Introspected schemas and the per-endpoint cache.
//!
//! ## Components
//!
//! - [`Schema`] - Normalized, name-keyed view of one endpoint's types
//! - [`resolve_base`] / [`scalar_to_primitive`] - Type reference unwrapping
//! - [`SchemaCache`] - Process-wide store of schemas keyed by endpoint
//!
//! Schemas are immutable once built. A new fetch produces a new [`Schema`]
//! which replaces the old one as a whole; nodes holding an endpoint and type
//! name observe the change on their next lookup.

mod cache;
pub mod introspection;
mod model;
mod resolver;

pub use cache::{FetchOutcome, SchemaCache};
pub use model::{ArgDef, FieldDef, OperationKind, Schema, TypeDef, TypeKind, TypeRef};
pub use resolver::{MAX_WRAPPING_DEPTH, Primitive, resolve_base, scalar_to_primitive};
