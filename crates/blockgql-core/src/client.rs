//! Executing compiled operations against an endpoint.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::schema::OperationKind;
use crate::transport::Transport;

/// Outcome of an operation the endpoint answered.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResponse {
    /// The `data` member of the response.
    Data(Value),
    /// Messages from a non-empty `errors` member.
    Errors(Vec<String>),
}

/// Client bound to one endpoint.
#[derive(Clone)]
pub struct GraphQlClient {
    transport: Arc<dyn Transport>,
    endpoint: String,
    headers: Vec<(String, String)>,
}

impl GraphQlClient {
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, operation_name: &str, document: &str) -> Result<OperationResponse, TransportError> {
        self.execute(OperationKind::Query, operation_name, document).await
    }

    pub async fn mutate(&self, operation_name: &str, document: &str) -> Result<OperationResponse, TransportError> {
        self.execute(OperationKind::Mutation, operation_name, document).await
    }

    /// Sends `document` and splits the body into data or errors.
    ///
    /// A body carrying both is reported as errors.
    pub async fn execute(
        &self,
        kind: OperationKind,
        operation_name: &str,
        document: &str,
    ) -> Result<OperationResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            operation = %operation_name,
            kind = kind.keyword(),
            "Executing operation"
        );
        let body = self.transport.send(&self.endpoint, document, &self.headers).await?;
        let response = split_response(&self.endpoint, body)?;
        if let OperationResponse::Errors(messages) = &response {
            warn!(
                endpoint = %self.endpoint,
                operation = %operation_name,
                errors = messages.len(),
                "Operation returned errors"
            );
        }
        Ok(response)
    }
}

fn split_response(endpoint: &str, mut body: Value) -> Result<OperationResponse, TransportError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let messages = errors
            .iter()
            .map(|e| match e.get("message").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => e.to_string(),
            })
            .collect();
        return Ok(OperationResponse::Errors(messages));
    }

    match body.get_mut("data").map(Value::take) {
        Some(data) => Ok(OperationResponse::Data(data)),
        None => Err(TransportError::Body {
            endpoint: endpoint.to_string(),
            message: "response has neither data nor errors".to_string(),
        }),
    }
}
