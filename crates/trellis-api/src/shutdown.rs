//! Graceful shutdown: signal handling plus an ordered cleanup stack.

use futures::future::BoxFuture;

type Cleanup = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Collects cleanup steps during startup and runs them in reverse order on
/// shutdown, so later-acquired resources are released first.
#[derive(Default)]
pub struct ShutdownHandler {
    cleanups: Vec<(String, Cleanup)>,
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, cleanup: F)
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        self.cleanups.push((name.into(), Box::new(cleanup)));
    }

    pub async fn run(self) {
        for (name, cleanup) in self.cleanups.into_iter().rev() {
            tracing::info!(step = %name, "running shutdown cleanup");
            cleanup().await;
        }
    }
}

/// Resolves on SIGINT or SIGTERM. Handed to axum as the graceful-shutdown
/// trigger.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt as _;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn cleanups_run_in_reverse_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handler = ShutdownHandler::new();

        for step in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            handler.register(step, move || {
                async move {
                    order.lock().unwrap().push(step);
                }
                .boxed()
            });
        }

        handler.run().await;
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
    }
}
