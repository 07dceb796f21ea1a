//! Readiness checks for external dependencies.

use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};

const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Blocks until `host:port` accepts a TCP connection, retrying every few
/// seconds until the deadline. Used at startup so the server never comes up
/// ahead of the services it depends on.
pub async fn wait_on_resource(name: &str, host: &str, port: u16, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let address = format!("{host}:{port}");

    loop {
        match TcpStream::connect(&address).await {
            Ok(_) => {
                tracing::info!(resource = name, %address, "resource is available");
                return Ok(());
            }
            Err(err) if Instant::now() >= deadline => {
                return Err(err)
                    .with_context(|| format!("timed out waiting for {name} at {address}"));
            }
            Err(err) => {
                tracing::debug!(resource = name, %address, error = %err, "resource not ready, retrying");
                sleep(RETRY_INTERVAL.min(deadline.saturating_duration_since(Instant::now())))
                    .await;
            }
        }

        if Instant::now() >= deadline {
            bail!("timed out waiting for {name} at {address}");
        }
    }
}
