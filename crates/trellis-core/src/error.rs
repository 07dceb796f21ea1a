//! Centralized error types for domain operations.

use thiserror::Error;
use trellis_graph::GraphApiError;

/// Main error type for domain operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// User-supplied input failed validation (maps to HTTP 400).
    #[error("{0}")]
    InvalidInput(String),

    /// A shortname is already in use or reserved (maps to HTTP 409).
    #[error("Shortname \"{0}\" taken")]
    NameTaken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The actor is known but not allowed to do this (maps to HTTP 403).
    #[error("{0}")]
    Forbidden(String),

    /// The Graph API answered with a shape this layer cannot re-shape.
    #[error("Unexpected Graph API response: {0}")]
    UnexpectedResponse(String),

    /// A semantic filter needs an embedding but no workflow is configured.
    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error(transparent)]
    Graph(#[from] GraphApiError),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Create a validation error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
