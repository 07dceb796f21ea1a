//! # Trellis API
//!
//! The HTTP front door: sequences external-dependency readiness checks,
//! installs middleware and proxies, and registers the domain routes. All
//! domain logic lives in `trellis-core`; all storage in the remote Graph
//! API.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod rpc;
pub mod shutdown;
pub mod state;
pub mod wait;
pub mod workflows;

pub use config::ApiConfig;
pub use routes::create_router;
pub use state::AppState;
