//! Transport seam for talking to GraphQL endpoints.
//!
//! The cache and the client only see [`Transport`]; [`HttpTransport`] is the
//! reqwest-backed implementation used by the CLI. Tests substitute their own
//! implementations or point [`HttpTransport`] at a mock server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::TransportError;

/// Sends a GraphQL document to an endpoint and returns the decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        document: &str,
        headers: &[(String, String)],
    ) -> Result<Value, TransportError>;
}

/// HTTP transport posting `{"query": ..., "variables": {}}` bodies.
pub struct HttpTransport {
    http: reqwest::Client,
    user_agent: String,
    headers: Vec<(String, String)>,
}

impl HttpTransport {
    /// Creates a transport with the default configuration.
    pub fn new() -> Result<Self, TransportError> {
        Self::from_config(&TransportConfig::default())
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        let mut headers: Vec<(String, String)> = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.sort();

        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
            headers,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        document: &str,
        headers: &[(String, String)],
    ) -> Result<Value, TransportError> {
        let body = json!({ "query": document, "variables": {} });

        let mut request = self
            .http
            .post(endpoint)
            .header(USER_AGENT, self.user_agent.as_str())
            .header("Accept", "application/json")
            .json(&body);

        for (name, value) in self.headers.iter().chain(headers) {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(endpoint = %endpoint, bytes = document.len(), "Sending GraphQL request");

        let response = request.send().await.map_err(|e| TransportError::Request {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| TransportError::Body {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let parsed: Result<Value, _> = serde_json::from_str(&text);

        if !status.is_success() {
            // A non-2xx answer with an `errors` body is a GraphQL-level failure.
            if let Ok(json) = parsed
                && json.get("errors").is_some()
            {
                return Ok(json);
            }
            return Err(TransportError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        parsed.map_err(|e| TransportError::Body {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}
