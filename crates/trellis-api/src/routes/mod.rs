//! Router assembly: routes, proxies, middleware layers.

pub mod entities;
pub mod entity_types;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{any, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{hydra, session_auth};
use crate::middleware::{self, LoginIdentifierKeyExtractor};
use crate::proxy;
use crate::rpc;
use crate::state::AppState;

/// JSON bodies larger than this are rejected before any handler runs.
const MAX_JSON_BODY_BYTES: usize = 16 * 1024 * 1024;

async fn hello() -> &'static str {
    "Hello from the Trellis API"
}

/// Liveness, plus OpenSearch reachability when a cluster is configured.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let search = match &state.search {
        Some(client) => json!(client.ping().await),
        None => Value::Null,
    };
    Json(json!({ "status": "ok", "search": search }))
}

fn entity_type_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(entity_types::create).put(entity_types::update),
        )
        .route("/bulk", put(entity_types::update_bulk))
        .route("/query", post(entity_types::query))
        .route("/query/subgraph", post(entity_types::query_subgraph))
        .route(
            "/query/closed-multi",
            post(entity_types::query_closed_multi),
        )
        .route("/resolve", get(entity_types::resolve))
        .route("/resolve/subgraph", post(entity_types::resolve_subgraph))
        .route("/permissions", get(entity_types::permissions))
        .route("/archive", post(entity_types::archive))
        .route("/unarchive", post(entity_types::unarchive))
}

/// Builds the full application router for the given state. Routes for
/// unconfigured collaborators (auth, OAuth2, RPC) are simply absent.
pub fn create_router(state: AppState) -> Router {
    let origin = state
        .config
        .frontend_url
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000"));
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    let mut router = Router::new()
        .route("/", get(hello))
        .route("/health-check", get(health_check))
        .nest("/entity-types", entity_type_routes())
        .route("/entities/update", post(entities::update));

    if state.config.rpc_enabled {
        router = router.route("/rpc/echo", get(rpc::echo));
    }

    if state.config.kratos_public_url.is_some() {
        // The login flow is throttled per account identifier, everything
        // else per client IP.
        let login_limit = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(6)
                .burst_size(10)
                .key_extractor(LoginIdentifierKeyExtractor)
                .finish()
                .expect("nonzero rate-limit configuration"),
        );
        let ip_limit = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(3)
                .burst_size(10)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("nonzero rate-limit configuration"),
        );

        router = router
            .merge(
                Router::new()
                    .route("/auth/self-service/login", any(proxy::kratos_proxy))
                    .layer(GovernorLayer::new(login_limit)),
            )
            .merge(
                Router::new()
                    .route("/auth/{*path}", any(proxy::kratos_proxy))
                    .layer(GovernorLayer::new(ip_limit)),
            );
    }

    if state.config.hydra_admin_url.is_some() {
        router = router.route(
            "/oauth2/consent",
            get(hydra::get_consent).post(hydra::post_consent),
        );
    }
    if state.config.hydra_public_url.is_some() {
        let ip_limit = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(3)
                .burst_size(10)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("nonzero rate-limit configuration"),
        );
        router = router.merge(
            Router::new()
                .route("/oauth2/{*path}", any(proxy::hydra_proxy))
                .layer(GovernorLayer::new(ip_limit)),
        );
    }

    router
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES))
        .with_state(state)
}
