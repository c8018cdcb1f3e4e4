pub mod blocks;
pub mod schema;

use std::sync::Arc;

use anyhow::{Context, Result};
use blockgql_core::{BlockGqlConfig, HttpTransport, Schema, SchemaCache};

/// Configuration plus the transport and cache shared by a command.
pub struct Session {
    pub config: BlockGqlConfig,
    pub transport: Arc<HttpTransport>,
    pub cache: Arc<SchemaCache>,
}

impl Session {
    pub fn new(config: BlockGqlConfig) -> Result<Self> {
        let transport =
            HttpTransport::from_config(&config.transport).context("Failed to build HTTP client")?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            cache: Arc::new(SchemaCache::new()),
        })
    }

    pub fn headers_for(&self, endpoint: &str) -> Vec<(String, String)> {
        self.config.headers_for(endpoint)
    }

    pub async fn fetch_schema(&self, endpoint: &str) -> Result<Arc<Schema>> {
        self.cache
            .fetch(self.transport.as_ref(), endpoint, &self.headers_for(endpoint))
            .await
            .with_context(|| format!("Failed to introspect {endpoint}"))
    }
}
