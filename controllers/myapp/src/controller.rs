//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the object store and the reconciler together and runs both
//! watchers until shutdown.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::{Context, Watcher};
use cluster_store::KubeStore;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main controller for MyAppResource management.
pub struct Controller {
    app_watcher: JoinHandle<Result<(), ControllerError>>,
    deletion_watcher: JoinHandle<Result<(), ControllerError>>,
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig, shutdown: CancellationToken) -> Result<Self, ControllerError> {
        info!("Initializing MyApp Controller");

        let client = Client::try_default().await?;
        let store = KubeStore::new(client.clone(), config.field_manager.clone());

        let reconciler = Reconciler::new(
            Arc::new(store),
            config.cluster_domain.clone(),
            config.resync_interval,
        );
        let ctx = Arc::new(Context::new(reconciler, shutdown, config.reconcile_timeout));

        let ns = config.namespace.as_deref();
        let watcher = Arc::new(Watcher::new(
            ctx,
            api(&client, ns),
            api(&client, ns),
            api(&client, ns),
            api(&client, ns),
        ));

        let app_watcher = {
            let watcher = watcher.clone();
            let (concurrency, debounce) = (config.concurrency, config.debounce);
            tokio::spawn(async move { watcher.watch_apps(concurrency, debounce).await })
        };
        let deletion_watcher = tokio::spawn(async move { watcher.watch_deletions().await });

        Ok(Self {
            app_watcher,
            deletion_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("MyApp Controller running");

        // The reconcile loop ends on SIGINT/SIGTERM; the deletion watcher ends with the shutdown token.
        tokio::select! {
            result = &mut self.app_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("MyAppResource watcher panicked: {}", e)))??;
                self.deletion_watcher.abort();
            }
            result = &mut self.deletion_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Deletion watcher panicked: {}", e)))??;
                self.app_watcher.await
                    .map_err(|e| ControllerError::Watch(format!("MyAppResource watcher panicked: {}", e)))??;
            }
        }

        info!("MyApp Controller stopped");
        Ok(())
    }
}
