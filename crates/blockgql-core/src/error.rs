//! Error types.
//!
//! Transport and schema failures leave the cache untouched; the caller logs
//! them and keeps editing against the previous schema. Conditions found while
//! revalidating nodes are not errors and live in [`crate::node::NodeCondition`].

use thiserror::Error;

use crate::schema::TypeKind;

/// Failures reported by a [`crate::Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid response body from {endpoint}: {message}")]
    Body { endpoint: String, message: String },

    #[error("transport configuration error: {0}")]
    Configuration(String),
}

/// The introspection request did not produce a usable schema document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed introspection response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
}

/// The endpoint answered with a GraphQL `errors` array.
#[derive(Debug, Clone, Error)]
#[error("{endpoint} reported schema errors: {}", .messages.join("; "))]
pub struct SchemaError {
    pub endpoint: String,
    pub messages: Vec<String>,
}

/// Errors surfaced by [`crate::SchemaCache::fetch`].
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A type reference that never reaches a named base type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvableTypeError {
    #[error("type reference is still wrapped after {depth} layers")]
    TooDeep { depth: usize },

    #[error("{kind} wrapper has no inner type")]
    MissingInner { kind: TypeKind },

    #[error("{kind} type reference has no name")]
    Unnamed { kind: TypeKind },
}

/// Structural edits that cannot be applied to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("scalar field `{field}` has no child slots")]
    ScalarNode { field: String },

    #[error("child slot {index} is out of range for {len} slots")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Failures reading or writing the persisted block representation.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("XML error: {0}")]
    Xml(String),

    #[error("document has no root element")]
    Empty,

    #[error("expected <{expected}> element, found <{found}>")]
    UnexpectedElement { expected: &'static str, found: String },

    #[error("missing attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("invalid value `{value}` for attribute `{name}`")]
    InvalidAttribute { name: &'static str, value: String },
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
