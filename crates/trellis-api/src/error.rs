//! Mapping of domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use trellis_core::DomainError;

/// Error type returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    /// The request needs a session that is missing or invalid.
    Unauthenticated(String),
    BadRequest(String),
    /// A proxied or upstream service misbehaved.
    Upstream(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Domain(err) => {
                let status = match &err {
                    DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    DomainError::NameTaken(_) => StatusCode::CONFLICT,
                    DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                    DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                    DomainError::UnexpectedResponse(_)
                    | DomainError::Workflow(_)
                    | DomainError::Graph(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "domain operation failed");
                }
                (status, err.to_string())
            }
            Self::Unauthenticated(message) => (StatusCode::UNAUTHORIZED, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => {
                tracing::error!(error = %message, "upstream service failed");
                (StatusCode::BAD_GATEWAY, message)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (
                DomainError::InvalidInput("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::NameTaken("ada".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                DomainError::NotFound("gone".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::Forbidden("no".to_string()),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::Domain(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
