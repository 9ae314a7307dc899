//! Reconciliation of `MyAppResource` specifications.
//!
//! - `syncer`: converge one managed object (create, or dry-run + diff + update)
//! - `cleaner`: delete managed objects, tolerating ones already gone
//! - `diff`: structural comparison used by the syncer
//!
//! `Reconciler::reconcile` is the single entry point. It holds no state
//! between invocations; everything it needs is read from the store.

pub mod cleaner;
pub mod diff;
pub mod syncer;

use crate::compiler::{self, AppIdentity};
use crate::error::{ControllerError, SyncErrors};
use cleaner::clean_objects;
use cluster_store::{ManagedObject, ObjectStore, cancellable};
use crds::{MyAppResourceSpec, MyAppResourceStatus};
use std::sync::Arc;
use std::time::Duration;
use syncer::sync_object;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Drives the managed objects of one specification to their desired state.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    cluster_domain: String,
    resync_interval: Option<Duration>,
}

impl Reconciler {
    /// Creates a new reconciler.
    ///
    /// # Arguments
    /// * `store` - Object store used for every read and write
    /// * `cluster_domain` - DNS domain used to build the cache address
    /// * `resync_interval` - Requeue delay after a completed reconciliation
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cluster_domain: impl Into<String>,
        resync_interval: Option<Duration>,
    ) -> Self {
        Self {
            store,
            cluster_domain: cluster_domain.into(),
            resync_interval,
        }
    }

    /// Reconcile one identity.
    ///
    /// Returns the delay after which the identity should be reconciled
    /// again. Failures of individual objects are recorded in the status and
    /// are not returned; only a failed status write, a failed lookup of the
    /// specification or a failed cleanup after deletion is an error.
    #[tracing::instrument(skip(self, cancel), fields(namespace = %identity.namespace, name = %identity.name))]
    pub async fn reconcile(
        &self,
        identity: &AppIdentity,
        cancel: &CancellationToken,
    ) -> Result<Option<Duration>, ControllerError> {
        let app = cancellable(cancel, self.store.get_app(&identity.namespace, &identity.name)).await?;

        match app {
            None => {
                self.clean_up(identity, cancel).await?;
                Ok(None)
            }
            Some(app) => {
                let status = self.converge(identity, &app.spec, cancel).await;
                if app.status.as_ref() == Some(&status) {
                    debug!("Status of {} unchanged", identity);
                } else {
                    self.write_status(identity, &status, cancel).await?;
                }
                Ok(self.resync_interval)
            }
        }
    }

    /// Remove every object that could exist for a deleted specification.
    async fn clean_up(&self, identity: &AppIdentity, cancel: &CancellationToken) -> Result<(), ControllerError> {
        info!("MyAppResource {} not found, removing managed objects", identity);
        let objects = compiler::all_managed_objects(identity, &self.cluster_domain);
        clean_objects(self.store.as_ref(), cancel, &objects)
            .await
            .map_err(|source| ControllerError::Cleanup {
                app: identity.to_string(),
                source,
            })
    }

    /// Sync or clean every managed object and fold the result into a status.
    async fn converge(
        &self,
        identity: &AppIdentity,
        spec: &MyAppResourceSpec,
        cancel: &CancellationToken,
    ) -> MyAppResourceStatus {
        let desired = compiler::compile(identity, spec, &self.cluster_domain);
        let mut errors = SyncErrors::new();

        match desired.cache {
            Some(cache) => {
                info!("Syncing redis backend");
                for object in cache.into_objects() {
                    self.sync_into(object, cancel, &mut errors).await;
                }
            }
            None => {
                let cache = compiler::cache_objects(identity).into_objects();
                if let Err(failures) = clean_objects(self.store.as_ref(), cancel, &cache).await {
                    error!("Failed to clean up redis objects: {}", failures);
                    errors.absorb(failures);
                }
            }
        }

        self.sync_into(desired.deployment.into(), cancel, &mut errors).await;
        self.sync_into(desired.service.into(), cancel, &mut errors).await;

        if errors.is_empty() {
            info!("MyAppResource {} converged", identity);
            MyAppResourceStatus::converged()
        } else {
            warn!("MyAppResource {} has {} failed step(s)", identity, errors.len());
            MyAppResourceStatus::failed(errors.to_string())
        }
    }

    async fn sync_into(&self, object: ManagedObject, cancel: &CancellationToken, errors: &mut SyncErrors) {
        if let Err(e) = sync_object(self.store.as_ref(), cancel, object).await {
            error!("{}", e);
            errors.push(e);
        }
    }

    async fn write_status(
        &self,
        identity: &AppIdentity,
        status: &MyAppResourceStatus,
        cancel: &CancellationToken,
    ) -> Result<(), ControllerError> {
        let result = cancellable(
            cancel,
            self.store.update_app_status(&identity.namespace, &identity.name, status),
        )
        .await;
        match result {
            Ok(()) => {
                debug!("Status of {} set to valid={}", identity, status.valid);
                Ok(())
            }
            Err(source) => {
                error!("Failed to update status of {}: {}", identity, source);
                Err(ControllerError::StatusUpdate {
                    app: identity.to_string(),
                    source,
                })
            }
        }
    }
}
