// src/graphql.rs

use crate::error::{QueryError, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named query document plus its variables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    pub operation_name: String,
    pub variables: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

/// The response envelope: data, errors, or both.
#[derive(Debug, Deserialize)]
pub struct GraphQLResult<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQLError>,
}

/// The query service the browser talks to.
pub trait QueryBackend: Send + Sync {
    fn execute(&self, request: &GraphQLRequest) -> Result<serde_json::Value>;
}

/// Builds a request from a document, naming it after its first operation.
pub fn gql(document: &str, variables: serde_json::Value) -> GraphQLRequest {
    GraphQLRequest {
        query: document.to_string(),
        operation_name: operation_name(document).unwrap_or_default().to_string(),
        variables,
    }
}

pub fn operation_name(document: &str) -> Option<&str> {
    let rest = document
        .trim_start()
        .strip_prefix("query")
        .or_else(|| document.trim_start().strip_prefix("mutation"))?
        .trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if end == 0 { None } else { Some(&rest[..end]) }
}

/// Runs the blocking backend off the UI task and decodes the envelope.
pub async fn query_graphql<T: DeserializeOwned>(
    backend: Arc<dyn QueryBackend>,
    request: GraphQLRequest,
) -> Result<GraphQLResult<T>> {
    debug!(
        "graphql: {} {}",
        request.operation_name, request.variables
    );
    let value = tokio::task::spawn_blocking(move || backend.execute(&request))
        .await
        .map_err(|e| QueryError::Transport(format!("query task failed: {e}")))??;
    Ok(serde_json::from_value(value)?)
}

pub fn data_or_throw_errors<T>(result: GraphQLResult<T>) -> Result<T> {
    match result.data {
        Some(data) if result.errors.is_empty() => Ok(data),
        _ => Err(QueryError::Graphql(result.errors)),
    }
}
