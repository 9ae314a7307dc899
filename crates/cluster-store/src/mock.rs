//! Mock object store for unit testing
//!
//! `MockStore` keeps objects in memory and behaves like a small API server:
//! it stamps resource versions, rejects stale updates, applies a few
//! server-side defaults on create and update (including dry runs), and
//! records every call so tests can count mutations. Failures can be
//! injected per operation and object name.

use crate::error::StoreError;
use crate::kinds::{ManagedKind, ManagedObject, ObjectKey};
use crate::store::{ObjectStore, WriteMode};
use crds::{MyAppResource, MyAppResourceStatus};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Store operation, as recorded by `MockStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Managed object lookup
    Get,
    /// Managed object creation
    Create,
    /// Persisted update
    Update,
    /// Dry-run update
    DryRun,
    /// Managed object deletion
    Delete,
    /// Specification lookup
    GetApp,
    /// Status subresource write
    UpdateStatus,
}

impl StoreOp {
    /// Whether the operation changes persisted state.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete | Self::UpdateStatus)
    }
}

/// A recorded call against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Operation that was called
    pub op: StoreOp,
    /// Namespace of the target
    pub namespace: String,
    /// Name of the target
    pub name: String,
}

/// Mock object store for testing
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    objects: Arc<Mutex<HashMap<ObjectKey, ManagedObject>>>,
    apps: Arc<Mutex<HashMap<(String, String), MyAppResource>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failures: Arc<Mutex<HashMap<(StoreOp, Option<ManagedKind>, String), String>>>,
    next_version: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a managed object as if it had been created earlier
    pub fn insert(&self, object: impl Into<ManagedObject>) {
        let mut object = object.into();
        let version = self.bump_version();
        object.metadata_mut().resource_version = Some(version);
        lock(&self.objects).insert(object.key(), object);
    }

    /// Seed an owning specification
    pub fn add_app(&self, app: MyAppResource) {
        let key = (
            app.metadata.namespace.clone().unwrap_or_default(),
            app.metadata.name.clone().unwrap_or_default(),
        );
        lock(&self.apps).insert(key, app);
    }

    /// Remove an owning specification, as if the user deleted it
    pub fn remove_app(&self, namespace: &str, name: &str) {
        lock(&self.apps).remove(&(namespace.to_string(), name.to_string()));
    }

    /// Current stored copy of an object
    pub fn object(&self, key: &ObjectKey) -> Option<ManagedObject> {
        lock(&self.objects).get(key).cloned()
    }

    /// Whether an object is stored under `key`
    pub fn contains(&self, key: &ObjectKey) -> bool {
        lock(&self.objects).contains_key(key)
    }

    /// Number of stored managed objects
    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Change a stored object behind the controller's back
    pub fn mutate(&self, key: &ObjectKey, change: impl FnOnce(&mut ManagedObject)) {
        if let Some(object) = lock(&self.objects).get_mut(key) {
            change(object);
        }
    }

    /// Last status written for a specification
    pub fn app_status(&self, namespace: &str, name: &str) -> Option<MyAppResourceStatus> {
        lock(&self.apps)
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|app| app.status.clone())
    }

    /// Make every `op` on objects named `name` fail with `message`
    pub fn fail(&self, op: StoreOp, name: &str, message: &str) {
        lock(&self.failures).insert((op, None, name.to_string()), message.to_string());
    }

    /// Make `op` fail with `message` for one kind of object only
    pub fn fail_kind(&self, op: StoreOp, kind: ManagedKind, name: &str, message: &str) {
        lock(&self.failures).insert((op, Some(kind), name.to_string()), message.to_string());
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Recorded calls of one operation
    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    /// Number of calls that changed persisted state
    pub fn mutating_calls(&self) -> usize {
        lock(&self.calls).iter().filter(|call| call.op.is_mutating()).count()
    }

    /// Forget every recorded call
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn bump_version(&self) -> String {
        let mut version = lock(&self.next_version);
        *version += 1;
        version.to_string()
    }

    fn record(
        &self,
        op: StoreOp,
        kind: Option<ManagedKind>,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        lock(&self.calls).push(StoreCall {
            op,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        let failures = lock(&self.failures);
        let failure = kind
            .and_then(|kind| failures.get(&(op, Some(kind), name.to_string())))
            .or_else(|| failures.get(&(op, None, name.to_string())));
        match failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

/// Fill in the fields a real API server would default.
fn apply_server_defaults(object: &mut ManagedObject, live: Option<&ManagedObject>, fresh_ip: &str) {
    match object {
        ManagedObject::Deployment(deployment) => {
            if let Some(spec) = deployment.spec.as_mut() {
                spec.revision_history_limit.get_or_insert(10);
                spec.progress_deadline_seconds.get_or_insert(600);
            }
        }
        ManagedObject::Service(service) => {
            let live_ip = match live {
                Some(ManagedObject::Service(live)) => {
                    live.spec.as_ref().and_then(|spec| spec.cluster_ip.clone())
                }
                _ => None,
            };
            if let Some(spec) = service.spec.as_mut() {
                let ip = live_ip.unwrap_or_else(|| fresh_ip.to_string());
                spec.cluster_ip = Some(ip.clone());
                spec.cluster_ips = Some(vec![ip]);
                spec.session_affinity.get_or_insert_with(|| "None".to_string());
            }
        }
        ManagedObject::StatefulSet(stateful_set) => {
            if let Some(spec) = stateful_set.spec.as_mut() {
                spec.pod_management_policy
                    .get_or_insert_with(|| "OrderedReady".to_string());
                spec.revision_history_limit.get_or_insert(10);
            }
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for MockStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        self.record(StoreOp::Get, Some(key.kind), &key.namespace, &key.name)?;
        Ok(self.object(key))
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        self.record(StoreOp::Create, Some(object.kind()), object.namespace(), object.name())?;
        let key = object.key();
        if self.contains(&key) {
            return Err(StoreError::Backend(format!("{key} already exists")));
        }
        let mut created = object.clone();
        let version = self.bump_version();
        apply_server_defaults(&mut created, None, &format!("10.96.0.{version}"));
        created.metadata_mut().resource_version = Some(version);
        lock(&self.objects).insert(key, created.clone());
        Ok(created)
    }

    async fn update(&self, object: &ManagedObject, mode: WriteMode) -> Result<ManagedObject, StoreError> {
        let op = match mode {
            WriteMode::Persist => StoreOp::Update,
            WriteMode::DryRun => StoreOp::DryRun,
        };
        self.record(op, Some(object.kind()), object.namespace(), object.name())?;

        let key = object.key();
        let live = self
            .object(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if let Some(requested) = object.resource_version() {
            if live.resource_version() != Some(requested) {
                return Err(StoreError::Backend(format!(
                    "conflict: {key} has been modified (resource version {requested} is stale)"
                )));
            }
        }

        let mut updated = object.clone();
        apply_server_defaults(&mut updated, Some(&live), "");
        if mode == WriteMode::DryRun {
            updated.metadata_mut().resource_version = live.resource_version().map(str::to_string);
            return Ok(updated);
        }
        updated.metadata_mut().resource_version = Some(self.bump_version());
        lock(&self.objects).insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.record(StoreOp::Delete, Some(key.kind), &key.namespace, &key.name)?;
        match lock(&self.objects).remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<MyAppResource>, StoreError> {
        self.record(StoreOp::GetApp, None, namespace, name)?;
        Ok(lock(&self.apps)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_app_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MyAppResourceStatus,
    ) -> Result<(), StoreError> {
        self.record(StoreOp::UpdateStatus, None, namespace, name)?;
        let mut apps = lock(&self.apps);
        let app = apps
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("MyAppResource {namespace}/{name}")))?;
        app.status = Some(status.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cancellable;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use tokio_util::sync::CancellationToken;

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ns".to_string()),
            ..Default::default()
        }
    }

    fn deployment(replicas: i32) -> ManagedObject {
        Deployment {
            metadata: meta("demo-podinfo"),
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_version() {
        let store = MockStore::new();
        let created = store.create(&deployment(1)).await.unwrap();

        let ManagedObject::Deployment(created) = created else {
            panic!("expected a deployment");
        };
        let spec = created.spec.unwrap();
        assert_eq!(spec.revision_history_limit, Some(10));
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert_eq!(store.mutating_calls(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_does_not_persist() {
        let store = MockStore::new();
        store.insert(deployment(1));
        let key = ObjectKey::new(ManagedKind::Deployment, "ns", "demo-podinfo");

        let preview = store.update(&deployment(5), WriteMode::DryRun).await.unwrap();
        assert_eq!(preview.resource_version(), Some("1"));
        assert_eq!(store.object(&key).unwrap(), {
            let mut seeded = deployment(1);
            seeded.metadata_mut().resource_version = Some("1".to_string());
            seeded
        });
        assert_eq!(store.mutating_calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_resource_version_is_rejected() {
        let store = MockStore::new();
        store.insert(deployment(1));

        let stale = deployment(2).with_resource_version(Some("0".to_string()));
        let result = store.update(&stale, WriteMode::Persist).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_service_keeps_allocated_cluster_ip() {
        let store = MockStore::new();
        let service: ManagedObject = Service {
            metadata: meta("demo-podinfo"),
            spec: Some(ServiceSpec::default()),
            ..Default::default()
        }
        .into();
        let created = store.create(&service).await.unwrap();
        let preview = store.update(&service, WriteMode::DryRun).await.unwrap();
        assert_eq!(created.spec_value().unwrap(), preview.spec_value().unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_not_found() {
        let store = MockStore::new();
        let key = ObjectKey::new(ManagedKind::StatefulSet, "ns", "demo-redis");
        let error = store.delete(&key).await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MockStore::new();
        store.fail(StoreOp::Create, "demo-podinfo", "admission webhook denied the request");
        let error = store.create(&deployment(1)).await.unwrap_err();
        assert!(error.to_string().contains("admission webhook denied"));
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_for_one_kind() {
        let store = MockStore::new();
        store.fail_kind(StoreOp::Create, ManagedKind::Deployment, "demo-podinfo", "denied");
        assert!(store.create(&deployment(1)).await.is_err());

        let service: ManagedObject = Service {
            metadata: meta("demo-podinfo"),
            spec: Some(ServiceSpec::default()),
            ..Default::default()
        }
        .into();
        assert!(store.create(&service).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let store = MockStore::new();
        let token = CancellationToken::new();
        token.cancel();
        let key = ObjectKey::new(ManagedKind::Deployment, "ns", "demo-podinfo");
        let result = cancellable(&token, store.get(&key)).await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }
}
