//! # blockgql-core
//!
//! Schema-aware GraphQL query nodes for block-based editors.
//!
//! A query is edited as a tree of [`QueryNode`]s, one per selected field.
//! Each node remembers only the endpoint and type it was built from and
//! re-resolves them through the [`SchemaCache`] whenever it is revalidated,
//! so replacing a schema never leaves dangling references behind.
//!
//! ## Flow
//!
//! 1. [`SchemaCache::load`] sends the introspection query through a
//!    [`Transport`] and atomically replaces the endpoint's [`Schema`].
//! 2. [`SchemaSynchronizer`] walks every live node bound to that endpoint
//!    (enumerated by an [`EditorSurface`]) and moves it between
//!    `Unbound`, `Bound` and `Stale`.
//! 3. [`compiler::compile`] turns a node tree into a [`Fragment`] plan plus
//!    coercion tags for the host interpreter, or into plain query text.
//!
//! ## Modules
//!
//! - [`schema`] - Introspection model, type resolution and the schema cache
//! - [`node`] - Query nodes, child mutators, suggestions and persistence
//! - [`sync`] - Revalidation of live nodes against fresh schemas
//! - [`compiler`] - Query text and host plan generation
//! - [`transport`] - Transport seam and the reqwest-backed implementation
//! - [`client`] - Executing compiled operations
//! - [`config`] - TOML configuration
//! - [`error`] - Error types

pub mod client;
pub mod compiler;
pub mod config;
pub mod error;
pub mod node;
pub mod schema;
pub mod sync;
pub mod transport;

pub use client::{GraphQlClient, OperationResponse};
pub use compiler::{Compiled, Fragment, compile, compile_operation};
pub use config::{BlockGqlConfig, EndpointConfig, TransportConfig};
pub use error::{
    CacheError, ConfigError, FetchError, MutationError, PersistError, SchemaError, TransportError,
    UnresolvableTypeError,
};
pub use node::{BoundValue, NodeCondition, NodeId, NodeState, Parameter, QueryNode};
pub use schema::{OperationKind, Primitive, Schema, SchemaCache, TypeKind};
pub use sync::{EditorSurface, Revalidation, SchemaSynchronizer, SurfaceEvent, SyncReport, Workspace};
pub use transport::{HttpTransport, Transport};

/// Result type for fallible schema cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
