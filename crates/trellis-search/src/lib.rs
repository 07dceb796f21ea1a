//! # Trellis Search
//!
//! OpenSearch connection client. Indexing and query DSL live elsewhere;
//! the front door only needs connect-time verification and health checks
//! over the cluster's REST interface.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Configuration for connecting to an OpenSearch cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub host: String,
    pub port: u16,
    pub https_enabled: bool,
    pub auth: Option<SearchAuth>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchAuth {
    pub username: String,
    pub password: String,
}

/// OpenSearch REST client.
#[derive(Clone)]
pub struct SearchClient {
    base_url: String,
    auth: Option<SearchAuth>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ClusterInfo {
    cluster_name: String,
}

impl SearchClient {
    /// Connect to the cluster, verifying reachability with a root-endpoint
    /// ping so that startup fails fast when OpenSearch is down.
    pub async fn connect(config: &SearchConfig) -> Result<Self> {
        let scheme = if config.https_enabled { "https" } else { "http" };
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let search = Self {
            base_url: format!("{}://{}:{}", scheme, config.host, config.port),
            auth: config.auth.clone(),
            client,
        };

        let info = search
            .cluster_info()
            .await
            .context("OpenSearch is not responding")?;
        info!(cluster = %info.cluster_name, "Connected to OpenSearch");

        Ok(search)
    }

    async fn cluster_info(&self) -> Result<ClusterInfo> {
        let mut request = self.client.get(&self.base_url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.context("Failed to reach OpenSearch")?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenSearch error ({}): {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse OpenSearch cluster info")
    }

    /// Whether the cluster currently answers on its root endpoint.
    pub async fn ping(&self) -> bool {
        self.cluster_info().await.is_ok()
    }
}
