//! Shared application state handed to every request handler.

use std::sync::Arc;

use trellis_cache::RedisPool;
use trellis_core::{GraphContext, UpdateHookRegistry};
use trellis_search::SearchClient;

use crate::auth::{HydraClient, KratosClient};
use crate::config::ApiConfig;
use crate::rpc::RpcEchoClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub ctx: GraphContext,
    /// Absent only when the process runs without Redis (tests); session
    /// caching degrades to a Kratos round trip per request.
    pub cache: Option<RedisPool>,
    pub search: Option<SearchClient>,
    pub hooks: Arc<UpdateHookRegistry>,
    pub http: reqwest::Client,
    pub kratos: Option<KratosClient>,
    pub hydra: Option<HydraClient>,
    pub rpc: Option<RpcEchoClient>,
}
