//! Server configuration, read from the environment.

use clap::Parser;

/// Trellis API server configuration. Every option can be set from the
/// environment, which is how deployments configure the process.
#[derive(Parser, Debug, Clone)]
#[command(name = "trellis-api", about = "Trellis knowledge-graph HTTP front door")]
pub struct ApiConfig {
    /// Port the HTTP server listens on.
    #[arg(long, env = "TRELLIS_HTTP_PORT", default_value_t = 5001)]
    pub port: u16,

    #[arg(long, env = "TRELLIS_REDIS_HOST")]
    pub redis_host: String,

    #[arg(long, env = "TRELLIS_REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Use TLS for the Redis connection.
    #[arg(long, env = "TRELLIS_REDIS_ENCRYPTED_TRANSIT")]
    pub redis_encrypted_transit: bool,

    #[arg(long, env = "TRELLIS_GRAPH_HTTP_HOST")]
    pub graph_host: String,

    #[arg(long, env = "TRELLIS_GRAPH_HTTP_PORT", default_value_t = 4000)]
    pub graph_port: u16,

    /// Public URL of the Ory Kratos API, proxied under `/auth`.
    #[arg(long, env = "TRELLIS_KRATOS_PUBLIC_URL")]
    pub kratos_public_url: Option<String>,

    /// Public URL of the Ory Hydra OAuth2 endpoints, proxied under `/oauth2`.
    #[arg(long, env = "TRELLIS_HYDRA_PUBLIC_URL")]
    pub hydra_public_url: Option<String>,

    /// Admin URL of Ory Hydra, used by the consent flow.
    #[arg(long, env = "TRELLIS_HYDRA_ADMIN_URL")]
    pub hydra_admin_url: Option<String>,

    #[arg(long, env = "TRELLIS_OPENSEARCH_ENABLED")]
    pub opensearch_enabled: bool,

    #[arg(long, env = "TRELLIS_OPENSEARCH_HOST", default_value = "localhost")]
    pub opensearch_host: String,

    #[arg(long, env = "TRELLIS_OPENSEARCH_PORT", default_value_t = 9200)]
    pub opensearch_port: u16,

    #[arg(long, env = "TRELLIS_OPENSEARCH_USERNAME")]
    pub opensearch_username: Option<String>,

    #[arg(long, env = "TRELLIS_OPENSEARCH_PASSWORD")]
    pub opensearch_password: Option<String>,

    #[arg(long, env = "TRELLIS_OPENSEARCH_HTTPS_ENABLED")]
    pub opensearch_https_enabled: bool,

    #[arg(long, env = "TRELLIS_RPC_ENABLED")]
    pub rpc_enabled: bool,

    #[arg(long, env = "TRELLIS_GRAPH_RPC_HOST")]
    pub rpc_host: Option<String>,

    #[arg(long, env = "TRELLIS_GRAPH_RPC_PORT", default_value_t = 4002)]
    pub rpc_port: u16,

    /// URL the frontend is served from; doubles as the CORS origin and the
    /// host new ontology type ids are minted under.
    #[arg(long, env = "TRELLIS_FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// Self-hosted instances skip the hosted email allowlist check.
    #[arg(long, env = "TRELLIS_SELF_HOSTED", action = clap::ArgAction::Set, default_value_t = true)]
    pub self_hosted: bool,

    /// Emails (`ada@example.com`) or domains (`@example.com`) admitted to a
    /// hosted instance, comma separated.
    #[arg(long, env = "TRELLIS_EMAIL_ALLOWLIST", value_delimiter = ',')]
    pub email_allowlist: Option<Vec<String>>,

    /// Embedding service for semantic search filters; semantic queries fail
    /// when unset.
    #[arg(long, env = "TRELLIS_EMBEDDING_SERVICE_URL")]
    pub embedding_service_url: Option<String>,
}

impl ApiConfig {
    pub fn redis_url(&self) -> String {
        let scheme = if self.redis_encrypted_transit {
            "rediss"
        } else {
            "redis"
        };
        format!("{}://{}:{}", scheme, self.redis_host, self.redis_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_for_optional_settings() {
        let config = ApiConfig::parse_from([
            "trellis-api",
            "--redis-host",
            "127.0.0.1",
            "--graph-host",
            "127.0.0.1",
        ]);
        assert_eq!(config.port, 5001);
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379");
        assert!(!config.rpc_enabled);
        assert!(config.self_hosted);
    }

    #[test]
    fn encrypted_transit_switches_redis_scheme() {
        let config = ApiConfig::parse_from([
            "trellis-api",
            "--redis-host",
            "cache.internal",
            "--redis-encrypted-transit",
            "--graph-host",
            "127.0.0.1",
        ]);
        assert_eq!(config.redis_url(), "rediss://cache.internal:6379");
    }

    #[test]
    fn email_allowlist_splits_on_commas() {
        let config = ApiConfig::parse_from([
            "trellis-api",
            "--redis-host",
            "127.0.0.1",
            "--graph-host",
            "127.0.0.1",
            "--email-allowlist",
            "ada@example.com,@trusted.org",
        ]);
        assert_eq!(
            config.email_allowlist,
            Some(vec!["ada@example.com".to_string(), "@trusted.org".to_string()])
        );
    }
}
