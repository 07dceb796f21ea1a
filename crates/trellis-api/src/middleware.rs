//! Request-id tagging and rate-limit key extraction.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tower_governor::key_extractor::{KeyExtractor, SmartIpKeyExtractor};
use tower_governor::GovernorError;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-trellis-request-id";

const REQUEST_ID_LENGTH: usize = 14;
const REQUEST_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Correlation id attached to every request and response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub fn generate_request_id() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(REQUEST_ID_LENGTH)
        .map(|byte| REQUEST_ID_ALPHABET[*byte as usize % REQUEST_ID_ALPHABET.len()] as char)
        .collect()
}

/// Tags the request with a short correlation id, logs the request line, and
/// echoes the id back on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = generate_request_id();

    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    tracing::info!(
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
        user_agent = %user_agent,
        "incoming request"
    );

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Keys rate limiting on the login identifier when the caller names one,
/// falling back to the client IP. This throttles guesses against a single
/// account independently of where they come from.
#[derive(Debug, Clone, Copy)]
pub struct LoginIdentifierKeyExtractor;

impl KeyExtractor for LoginIdentifierKeyExtractor {
    type Key = String;

    fn extract<T>(&self, request: &axum::http::Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(identifier) = request.uri().query().and_then(|query| {
            query.split('&').find_map(|pair| {
                pair.strip_prefix("identifier=")
                    .filter(|value| !value.is_empty())
            })
        }) {
            return Ok(format!("identifier:{identifier}"));
        }
        SmartIpKeyExtractor
            .extract(request)
            .map(|ip| ip.to_string())
    }
}
