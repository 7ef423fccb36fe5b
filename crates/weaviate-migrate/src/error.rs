//! Error types for weaviate-migrate.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating between Weaviate instances.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{operation} failed with HTTP {status}: {body}")]
    Status {
        /// What was being attempted, e.g. `insert object`.
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The GraphQL endpoint returned errors.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The requested class does not exist on the instance.
    #[error("Class '{0}' not found")]
    ClassNotFound(String),

    /// Creating a class schema was rejected by the destination.
    #[error("Failed to create class '{class}' (HTTP {status}): {body}")]
    SchemaCreate {
        /// Class that could not be created.
        class: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Rate limited by the server; value is the suggested wait in seconds.
    #[error("Rate limited, retry after {0}s")]
    RateLimit(u64),

    /// Authentication was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected response payload.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::SchemaCreate { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::RateLimit(_) => Some(429),
            _ => None,
        }
    }
}

/// Maps an error response to the matching error variant.
pub fn from_status(status: u16, body: String, operation: &str) -> Error {
    match status {
        429 => Error::RateLimit(60),
        401 | 403 => Error::Authentication(format!("{operation}: {body}")),
        _ => Error::Status {
            operation: operation.to_string(),
            status,
            body,
        },
    }
}
