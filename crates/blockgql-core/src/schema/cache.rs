//! Process-wide schema cache keyed by endpoint.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use super::introspection::{INTROSPECTION_QUERY, ResponseProblem, parse_response};
use super::model::{OperationKind, Schema};
use crate::error::{CacheError, FetchError, SchemaError};
use crate::node::suggestions::{NodeTemplate, SuggestionSource, regenerate_suggestions};
use crate::transport::Transport;

/// Terminal result of one introspection fetch.
///
/// Only [`FetchOutcome::Loaded`] changes the cache.
#[derive(Debug)]
pub enum FetchOutcome {
    Loaded(Arc<Schema>),
    TransportFailed(FetchError),
    SchemaErrors(SchemaError),
}

impl FetchOutcome {
    pub fn into_result(self) -> Result<Arc<Schema>, CacheError> {
        match self {
            Self::Loaded(schema) => Ok(schema),
            Self::TransportFailed(err) => Err(err.into()),
            Self::SchemaErrors(err) => Err(err.into()),
        }
    }
}

/// Store of the latest schema per endpoint.
///
/// Created once at startup and shared through `Arc`. Entries are replaced
/// whole; readers receive an `Arc<Schema>` snapshot that stays valid even if
/// the entry is replaced afterwards.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: DashMap<String, Arc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current schema for `endpoint`, if one has been loaded.
    pub fn get(&self, endpoint: &str) -> Option<Arc<Schema>> {
        self.schemas.get(endpoint).map(|entry| Arc::clone(entry.value()))
    }

    /// Replaces the schema for `endpoint`, returning the previous one.
    pub fn insert(&self, endpoint: impl Into<String>, schema: Schema) -> Option<Arc<Schema>> {
        self.schemas.insert(endpoint.into(), Arc::new(schema))
    }

    pub fn remove(&self, endpoint: &str) -> Option<Arc<Schema>> {
        self.schemas.remove(endpoint).map(|(_, schema)| schema)
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.schemas.contains_key(endpoint)
    }

    /// Endpoints with a loaded schema, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        endpoints.sort();
        endpoints
    }

    /// Runs the introspection query and replaces the cached schema on success.
    ///
    /// Failures are logged and leave the previous entry in place. When two
    /// loads for the same endpoint overlap, the one that finishes last wins.
    pub async fn load(
        &self,
        transport: &dyn Transport,
        endpoint: &str,
        headers: &[(String, String)],
    ) -> FetchOutcome {
        let body = match transport.send(endpoint, INTROSPECTION_QUERY, headers).await {
            Ok(body) => body,
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Schema fetch failed");
                return FetchOutcome::TransportFailed(e.into());
            }
        };

        match parse_response(body) {
            Ok(schema) => {
                let count = schema.type_count();
                let schema = Arc::new(schema);
                let previous = self
                    .schemas
                    .insert(endpoint.to_string(), Arc::clone(&schema));
                info!(
                    endpoint = %endpoint,
                    types = count,
                    replaced = previous.is_some(),
                    "Schema loaded"
                );
                FetchOutcome::Loaded(schema)
            }
            Err(ResponseProblem::Errors(messages)) => {
                let err = SchemaError {
                    endpoint: endpoint.to_string(),
                    messages,
                };
                warn!(endpoint = %endpoint, error = %err, "Endpoint returned schema errors");
                FetchOutcome::SchemaErrors(err)
            }
            Err(ResponseProblem::Malformed(message)) => {
                warn!(endpoint = %endpoint, error = %message, "Malformed introspection response");
                FetchOutcome::TransportFailed(FetchError::Malformed {
                    endpoint: endpoint.to_string(),
                    message,
                })
            }
        }
    }

    /// Like [`SchemaCache::load`], folded into a `Result`.
    pub async fn fetch(
        &self,
        transport: &dyn Transport,
        endpoint: &str,
        headers: &[(String, String)],
    ) -> Result<Arc<Schema>, CacheError> {
        self.load(transport, endpoint, headers).await.into_result()
    }

    /// Templates for the fields of the query or mutation root.
    pub fn root_suggestions(&self, endpoint: &str, kind: OperationKind) -> Option<Vec<NodeTemplate>> {
        let schema = self.get(endpoint)?;
        let root = schema.root_type(kind)?;
        Some(regenerate_suggestions(endpoint, root).collect())
    }
}

impl SuggestionSource for SchemaCache {
    fn suggestions(&self, endpoint: &str, type_name: &str) -> Option<Vec<NodeTemplate>> {
        let schema = self.get(endpoint)?;
        let type_def = schema.get_type(type_name)?;
        Some(regenerate_suggestions(endpoint, type_def).collect())
    }
}
