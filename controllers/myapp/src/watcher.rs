//! Kubernetes resource watchers.
//!
//! Two watchers drive `Reconciler::reconcile`:
//! - a `kube_runtime::Controller` over `MyAppResource` that also watches the
//!   Deployments, Services and StatefulSets it manages and maps each one back
//!   to its owner by name
//! - a raw watcher that turns `MyAppResource` deletions into a reconcile of
//!   the deleted identity, which removes every managed object
//!
//! A managed object whose owner is no longer in the controller's cache
//! (deleted while the controller was down, or recreated by an invocation that
//! raced a deletion) makes the runtime report `ObjectNotFound`; that identity
//! is reconciled as well, which removes the leftovers.
//!
//! Each invocation gets a child of the shutdown token and a deadline.

use crate::backoff::BackoffTracker;
use crate::compiler::AppIdentity;
use crate::compiler::labels::{NAMESPACE_LABEL, owner_name};
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::MyAppResource;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use kube::{Api, Resource};
use kube_runtime::controller::{self, Action, Config as ControllerConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{Controller, WatchStreamExt, watcher};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation
pub struct Context {
    reconciler: Reconciler,
    backoff: BackoffTracker,
    shutdown: CancellationToken,
    timeout: Duration,
}

impl Context {
    /// Creates the shared context; `timeout` bounds each invocation.
    pub fn new(reconciler: Reconciler, shutdown: CancellationToken, timeout: Duration) -> Self {
        Self {
            reconciler,
            backoff: BackoffTracker::new(),
            shutdown,
            timeout,
        }
    }

    /// Run one reconciliation under a child token and the configured deadline.
    pub async fn reconcile(&self, identity: &AppIdentity) -> Result<Option<Duration>, ControllerError> {
        let cancel = self.shutdown.child_token();
        let result = tokio::select! {
            result = self.reconciler.reconcile(identity, &cancel) => result,
            () = tokio::time::sleep(self.timeout) => {
                cancel.cancel();
                Err(ControllerError::Timeout(identity.to_string()))
            }
        };

        match &result {
            Ok(_) => self.backoff.reset(&identity.to_string()),
            Err(e) => debug!("Reconciliation of {} failed: {}", identity, e),
        }
        result
    }
}

/// Map a managed object back to the `MyAppResource` that owns it.
fn owner_of<K: Resource>(object: &K) -> Option<ObjectRef<MyAppResource>> {
    let meta = object.meta();
    let owner = owner_name(meta.name.as_deref()?)?;
    Some(ObjectRef::new(owner).within(meta.namespace.as_deref()?))
}

/// Identity of an owner the runtime could not find for a managed object.
fn orphaned_identity(error: &controller::Error<ControllerError, watcher::Error>) -> Option<AppIdentity> {
    match error {
        controller::Error::ObjectNotFound(owner) => {
            Some(AppIdentity::new(owner.namespace.as_deref()?, owner.name.as_str()))
        }
        _ => None,
    }
}

async fn reconcile(app: Arc<MyAppResource>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let Some(identity) = AppIdentity::of(&app) else {
        warn!("Ignoring MyAppResource without a name or namespace");
        return Ok(Action::await_change());
    };

    Ok(match ctx.reconcile(&identity).await? {
        Some(interval) => Action::requeue(interval),
        None => Action::await_change(),
    })
}

fn error_policy(app: Arc<MyAppResource>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let key = AppIdentity::of(&app)
        .map(|identity| identity.to_string())
        .unwrap_or_default();
    let delay = ctx.backoff.next_backoff(&key);
    error!("Reconciliation error for MyAppResource {}: {} (retrying in {:?})", key, error, delay);
    Action::requeue(delay)
}

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    ctx: Arc<Context>,
    app_api: Api<MyAppResource>,
    deployment_api: Api<Deployment>,
    service_api: Api<Service>,
    stateful_set_api: Api<StatefulSet>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        ctx: Arc<Context>,
        app_api: Api<MyAppResource>,
        deployment_api: Api<Deployment>,
        service_api: Api<Service>,
        stateful_set_api: Api<StatefulSet>,
    ) -> Self {
        Self {
            ctx,
            app_api,
            deployment_api,
            service_api,
            stateful_set_api,
        }
    }

    /// Runs the reconcile loop for `MyAppResource` and its managed objects.
    pub async fn watch_apps(&self, concurrency: u16, debounce: Duration) -> Result<(), ControllerError> {
        info!("Starting MyAppResource watcher");

        let managed = || watcher::Config::default().labels(NAMESPACE_LABEL);
        let controller_config = ControllerConfig::default()
            .debounce(debounce)
            .concurrency(concurrency);
        let ctx = self.ctx.clone();

        Controller::new(self.app_api.clone(), watcher::Config::default())
            .watches(self.deployment_api.clone(), managed(), |d: Deployment| owner_of(&d))
            .watches(self.service_api.clone(), managed(), |s: Service| owner_of(&s))
            .watches(self.stateful_set_api.clone(), managed(), |s: StatefulSet| owner_of(&s))
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx.clone())
            .for_each(|res| {
                let ctx = ctx.clone();
                async move {
                    match res {
                        Ok((object, _)) => debug!("Reconciled {}", object),
                        Err(e) => match orphaned_identity(&e) {
                            Some(identity) => {
                                info!("Owner {} of managed objects is gone, removing them", identity);
                                if let Err(e) = ctx.reconcile(&identity).await {
                                    error!("Failed to clean up after {}: {}", identity, e);
                                }
                            }
                            None => warn!("Controller error: {}", e),
                        },
                    }
                }
            })
            .await;

        info!("MyAppResource watcher stopped");
        Ok(())
    }

    /// Reconciles deleted `MyAppResource` identities so their objects are removed.
    pub async fn watch_deletions(&self) -> Result<(), ControllerError> {
        info!("Starting MyAppResource deletion watcher");

        let mut stream = watcher(self.app_api.clone(), watcher::Config::default())
            .default_backoff()
            .boxed();

        loop {
            let event = tokio::select! {
                () = self.ctx.shutdown.cancelled() => break,
                event = stream.next() => event,
            };
            let Some(event) = event else {
                return Err(ControllerError::Watch(
                    "MyAppResource deletion watch stream ended".to_string(),
                ));
            };

            match event {
                Ok(watcher::Event::Delete(app)) => {
                    let Some(identity) = AppIdentity::of(&app) else {
                        continue;
                    };
                    info!("MyAppResource deleted: {}", identity);
                    if let Err(e) = self.ctx.reconcile(&identity).await {
                        error!("Failed to clean up after {}: {}", identity, e);
                    }
                }
                Ok(watcher::Event::InitDone) => {
                    debug!("MyAppResource deletion watcher initialization complete");
                }
                Ok(_) => {}
                Err(e) => warn!("MyAppResource watch error: {}", e),
            }
        }

        info!("MyAppResource deletion watcher stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler;
    use crate::test_utils::*;
    use cluster_store::{MockStore, StoreOp};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn service(name: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn context(store: &MockStore, timeout: Duration) -> Context {
        Context::new(create_test_reconciler(store), CancellationToken::new(), timeout)
    }

    #[test]
    fn test_owner_of_managed_objects() {
        let owner = owner_of(&service("demo-redis")).unwrap();
        assert_eq!(owner.name, "demo");
        assert_eq!(owner.namespace.as_deref(), Some("ns"));

        assert!(owner_of(&service("kubernetes")).is_none());
        assert!(owner_of(&Deployment::default()).is_none());
    }

    #[tokio::test]
    async fn test_missing_owner_removes_leftover_objects() {
        let store = MockStore::new();
        let identity = AppIdentity::new("ns", "demo");
        for object in compiler::all_managed_objects(&identity, "cluster.local") {
            store.insert(object);
        }
        let ctx = context(&store, Duration::from_secs(30));

        let owner = owner_of(&service("demo-podinfo")).unwrap();
        let error = controller::Error::ObjectNotFound(owner.erase());
        let orphan = orphaned_identity(&error).unwrap();
        assert_eq!(orphan, identity);

        ctx.reconcile(&orphan).await.unwrap();
        assert_eq!(store.object_count(), 0);
    }

    #[test]
    fn test_other_controller_errors_have_no_orphan() {
        let owner = ObjectRef::<MyAppResource>::new("demo").within("ns").erase();
        let error = controller::Error::ReconcilerFailed(ControllerError::Timeout("ns/demo".to_string()), owner);
        assert!(orphaned_identity(&error).is_none());
    }

    #[tokio::test]
    async fn test_context_reconcile_resets_backoff() {
        let store = MockStore::new();
        store.add_app(create_test_app("demo", "ns", demo_spec(false)));
        let ctx = context(&store, Duration::from_secs(30));
        let identity = AppIdentity::new("ns", "demo");

        ctx.backoff.next_backoff("ns/demo");
        ctx.backoff.next_backoff("ns/demo");
        ctx.reconcile(&identity).await.unwrap();
        assert_eq!(ctx.backoff.next_backoff("ns/demo"), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_context_reconcile_reports_failure() {
        let store = MockStore::new();
        store.add_app(create_test_app("demo", "ns", demo_spec(false)));
        store.fail(StoreOp::UpdateStatus, "demo", "etcd unavailable");
        let ctx = context(&store, Duration::from_secs(30));

        let error = ctx.reconcile(&AppIdentity::new("ns", "demo")).await.unwrap_err();
        assert!(matches!(error, ControllerError::StatusUpdate { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_shutdown_aborts_reconcile() {
        let store = MockStore::new();
        store.add_app(create_test_app("demo", "ns", demo_spec(false)));
        let ctx = context(&store, Duration::from_secs(30));
        ctx.shutdown.cancel();

        let error = ctx.reconcile(&AppIdentity::new("ns", "demo")).await.unwrap_err();
        assert!(matches!(error, ControllerError::Store(_)));
        assert_eq!(store.mutating_calls(), 0);
    }
}
