//! Reverse proxies for the Ory auth services.
//!
//! Hydra's public OAuth2 endpoints are forwarded with their path intact;
//! Kratos is mounted under `/auth`, which is stripped before forwarding.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, HOST};
use axum::http::HeaderValue;
use axum::response::Response;

use crate::error::ApiError;
use crate::state::AppState;

/// Matches the 16 MiB body limit the router enforces.
const MAX_PROXY_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Forwards the request to `base_url` joined with `path_and_query` and
/// relays the upstream response verbatim.
pub async fn proxy_request(
    client: &reqwest::Client,
    base_url: &str,
    path_and_query: &str,
    request: Request,
) -> Result<Response, ApiError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path_and_query);
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_PROXY_BODY_BYTES)
        .await
        .map_err(|err| ApiError::BadRequest(format!("failed to read request body: {err}")))?;

    let mut headers = parts.headers;
    headers.remove(HOST);

    let upstream_response = client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|err| ApiError::Upstream(format!("proxy request to {url} failed: {err}")))?;

    let status = upstream_response.status();
    let headers = upstream_response.headers().clone();
    let bytes = upstream_response
        .bytes()
        .await
        .map_err(|err| ApiError::Upstream(format!("failed to read proxy response: {err}")))?;

    let mut response = Response::builder().status(status);
    if let Some(response_headers) = response.headers_mut() {
        *response_headers = headers;
    }
    response
        .body(Body::from(bytes))
        .map_err(|err| ApiError::Upstream(format!("failed to assemble proxy response: {err}")))
}

/// Pass-through to Hydra's public OAuth2 endpoints.
pub async fn hydra_proxy(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let base_url = state
        .config
        .hydra_public_url
        .clone()
        .ok_or_else(|| ApiError::Upstream("OAuth2 provider is not configured".to_string()))?;
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    proxy_request(&state.http, &base_url, &path_and_query, request).await
}

/// Pass-through to Kratos, with the `/auth` mount prefix stripped and the
/// CORS origin header rewritten to the one this server advertises. Kratos
/// only knows its own public URL, so its CORS answer would otherwise name
/// the wrong origin.
pub async fn kratos_proxy(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let base_url = state
        .config
        .kratos_public_url
        .clone()
        .ok_or_else(|| ApiError::Upstream("auth provider is not configured".to_string()))?;

    let path = request.uri().path().trim_start_matches("/auth");
    let path = if path.is_empty() { "/" } else { path };
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut response = proxy_request(&state.http, &base_url, &path_and_query, request).await?;
    if response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN) {
        if let Ok(origin) = HeaderValue::from_str(&state.config.frontend_url) {
            response
                .headers_mut()
                .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
    }
    Ok(response)
}
