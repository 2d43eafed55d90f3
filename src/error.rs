// src/error.rs

use thiserror::Error;

use crate::graphql::GraphQLError;

#[derive(Error, Debug)]
pub enum QueryError {
    /// The backend could not be reached or failed outside the query itself.
    #[error("transport error: {0}")]
    Transport(String),

    /// Errors reported by the query (access denied, bad arguments, ...).
    #[error("{}", join_messages(.0))]
    Graphql(Vec<GraphQLError>),

    /// The query succeeded but the response lacks the nodes it promised.
    #[error("invalid GraphQL response: query {operation} returned an unexpected shape")]
    InvalidResponse {
        operation: String,
        errors: Vec<GraphQLError>,
    },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl QueryError {
    pub fn invalid_response(operation: &str, errors: Vec<GraphQLError>) -> Self {
        QueryError::InvalidResponse {
            operation: operation.to_string(),
            errors,
        }
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "graphql: response has no data".to_string();
    }
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, QueryError>;
