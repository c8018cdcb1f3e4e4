//! Configuration.
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) is a valid configuration.
//!
//! # Example Configuration
//!
//! ```toml
//! log_level = "debug"
//! default_endpoint = "pokemon"
//!
//! [transport]
//! timeout_secs = 10
//! user_agent = "my-editor/1.0"
//!
//! [transport.headers]
//! X-Client = "blocks"
//!
//! [endpoints.pokemon]
//! url = "https://graphql-pokemon.example/graphql"
//!
//! [endpoints.github]
//! url = "https://api.github.com/graphql"
//! headers = { Authorization = "bearer TOKEN" }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockGqlConfig {
    /// Log level used when `RUST_LOG` is not set.
    /// Default: "info"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub transport: TransportConfig,

    /// Named endpoints.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointConfig>,

    /// Endpoint used when none is given explicitly.
    #[serde(default)]
    pub default_endpoint: Option<String>,
}

/// HTTP transport settings shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Request timeout in seconds.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Default: "blockgql"
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,

    /// Extra headers for this endpoint only.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "blockgql".to_string()
}

impl Default for BlockGqlConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            transport: TransportConfig::default(),
            endpoints: BTreeMap::new(),
            default_endpoint: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl BlockGqlConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.transport.timeout_secs == 0 {
            return Err("transport.timeout_secs must be > 0".into());
        }
        if self.transport.user_agent.trim().is_empty() {
            return Err("transport.user_agent must not be empty".into());
        }
        for (name, endpoint) in &self.endpoints {
            let url = Url::parse(&endpoint.url)
                .map_err(|e| format!("endpoints.{name}.url is not a valid URL: {e}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(format!("endpoints.{name}.url must use http or https"));
            }
        }
        if let Some(default) = &self.default_endpoint
            && !self.endpoints.contains_key(default)
        {
            return Err(format!("default_endpoint `{default}` is not a configured endpoint"));
        }
        Ok(())
    }

    /// Resolves an endpoint argument to a URL.
    ///
    /// A configured name maps to its URL; anything else is used as a URL
    /// verbatim. `None` selects the default endpoint.
    pub fn resolve_endpoint(&self, name_or_url: Option<&str>) -> Option<String> {
        match name_or_url {
            Some(value) => Some(
                self.endpoints
                    .get(value)
                    .map_or_else(|| value.to_string(), |e| e.url.clone()),
            ),
            None => self
                .default_endpoint
                .as_ref()
                .and_then(|name| self.endpoints.get(name))
                .map(|e| e.url.clone()),
        }
    }

    /// Per-endpoint headers for a resolved URL, sorted by name.
    pub fn headers_for(&self, url: &str) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .endpoints
            .values()
            .filter(|e| e.url == url)
            .flat_map(|e| e.headers.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        headers.sort();
        headers
    }
}
