//! MyApp Controller
//!
//! Reconciles `MyAppResource` specifications into a podinfo frontend
//! (Deployment + Service) and an optional Redis cache (StatefulSet +
//! Service), and reports the outcome in the resource's status.

mod backoff;
mod compiler;
mod config;
mod controller;
mod error;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Resolve once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube's rustls stack needs a process-wide crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting MyApp Controller");

    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Cluster domain: {}", config.cluster_domain);
    match config.resync_interval {
        Some(interval) => info!("  Resync interval: {:?}", interval),
        None => info!("  Resync interval: disabled"),
    }
    info!("  Reconcile timeout: {:?}", config.reconcile_timeout);
    info!("  Concurrency: {}", config.concurrency);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    // Initialize and run controller
    let controller = Controller::new(config, shutdown).await?;
    controller.run().await?;

    Ok(())
}
