//! Trellis API server binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use futures::FutureExt as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_api::auth::{HydraClient, KratosClient};
use trellis_api::rpc::RpcEchoClient;
use trellis_api::shutdown::{shutdown_signal, ShutdownHandler};
use trellis_api::wait::wait_on_resource;
use trellis_api::workflows::EmbeddingServiceClient;
use trellis_api::{create_router, ApiConfig, AppState};
use trellis_core::context::EmbeddingWorkflow;
use trellis_core::{GraphContext, InstanceSettings, UpdateHookRegistry};
use trellis_graph::client::{GraphApiClient, GraphApiConfig};
use trellis_graph::types::{ActorType, EditionProvenance};
use trellis_search::{SearchAuth, SearchClient, SearchConfig};

/// How long startup waits for external dependencies before giving up.
const RESOURCE_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trellis_api=info,trellis_core=info,trellis_graph=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ApiConfig::parse();
    init_tracing();

    futures::try_join!(
        wait_on_resource(
            "redis",
            &config.redis_host,
            config.redis_port,
            RESOURCE_WAIT_TIMEOUT,
        ),
        wait_on_resource(
            "graph-api",
            &config.graph_host,
            config.graph_port,
            RESOURCE_WAIT_TIMEOUT,
        ),
    )?;

    let mut shutdown = ShutdownHandler::new();

    let cache = trellis_cache::init_pool(&config.redis_url())
        .await
        .context("failed to connect to Redis")?;
    {
        let cache = cache.clone();
        shutdown.register("redis", move || {
            async move {
                drop(cache);
            }
            .boxed()
        });
    }

    let graph = GraphApiClient::new(&GraphApiConfig {
        host: config.graph_host.clone(),
        port: config.graph_port,
    });
    let system_account = graph
        .get_or_create_system_account()
        .await
        .context("failed to resolve the system account")?;
    tracing::info!(%system_account, "resolved system account");

    let search = if config.opensearch_enabled {
        let client = SearchClient::connect(&SearchConfig {
            host: config.opensearch_host.clone(),
            port: config.opensearch_port,
            https_enabled: config.opensearch_https_enabled,
            auth: config.opensearch_username.clone().map(|username| SearchAuth {
                username,
                password: config.opensearch_password.clone().unwrap_or_default(),
            }),
        })
        .await
        .context("failed to connect to the search cluster")?;
        Some(client)
    } else {
        None
    };

    let http = reqwest::Client::new();
    let embedder = config
        .embedding_service_url
        .as_deref()
        .map(|url| EmbeddingServiceClient::new(url, http.clone()));

    let ctx = GraphContext {
        graph,
        provenance: EditionProvenance::api(ActorType::User),
        system_account,
        instance: InstanceSettings {
            frontend_url: config.frontend_url.clone(),
            self_hosted: config.self_hosted,
            email_allowlist: config.email_allowlist.clone(),
        },
        embedder: embedder.map(|client| Arc::new(client) as Arc<dyn EmbeddingWorkflow>),
    };

    let kratos = config
        .kratos_public_url
        .as_deref()
        .map(|url| KratosClient::new(url, http.clone()));
    let hydra = config
        .hydra_admin_url
        .as_deref()
        .map(|url| HydraClient::new(url, http.clone()));
    let rpc = if config.rpc_enabled {
        let host = config
            .rpc_host
            .clone()
            .context("TRELLIS_GRAPH_RPC_HOST is required when RPC is enabled")?;
        Some(RpcEchoClient::new(&host, config.rpc_port))
    } else {
        None
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        ctx,
        cache: Some(cache),
        search,
        hooks: Arc::new(UpdateHookRegistry::with_system_hooks()),
        http,
        kratos,
        hydra,
        rpc,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "listening");

    // ConnectInfo feeds the rate limiters' IP key extraction.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    shutdown.run().await;
    tracing::info!("shutdown complete");
    Ok(())
}
