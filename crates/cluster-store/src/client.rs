//! Kubernetes-backed object store
//!
//! Implements `ObjectStore` over typed `kube::Api` handles. Every call is a
//! single request against the API server; nothing is cached.

use crate::error::StoreError;
use crate::kinds::{ManagedKind, ManagedObject, ObjectKey};
use crate::store::{ObjectStore, WriteMode};
use crds::{MyAppResource, MyAppResourceStatus};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Object store talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Create a store on top of an existing client
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `field_manager` - Field manager name recorded on every write
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self, mode: WriteMode) -> PostParams {
        let mut params = PostParams::default();
        params.dry_run = mode == WriteMode::DryRun;
        params.field_manager = Some(self.field_manager.clone());
        params
    }

    async fn get_typed<K>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        debug!("Fetching {}", key);
        Ok(self.api::<K>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_typed<K>(&self, namespace: &str, object: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Serialize + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let params = self.post_params(WriteMode::Persist);
        Ok(self.api::<K>(namespace).create(&params, object).await?)
    }

    async fn replace_typed<K>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
        mode: WriteMode,
    ) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + Serialize + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let params = self.post_params(mode);
        Ok(self.api::<K>(namespace).replace(name, &params, object).await?)
    }

    async fn delete_typed<K>(&self, key: &ObjectKey) -> Result<(), StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        debug!("Deleting {}", key);
        self.api::<K>(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

/// Reject objects that cannot be addressed.
fn addressable(object: &ManagedObject) -> Result<(), StoreError> {
    if object.name().is_empty() || object.namespace().is_empty() {
        return Err(StoreError::Invalid(format!(
            "{} is missing a name or namespace",
            object.kind()
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError> {
        Ok(match key.kind {
            ManagedKind::Deployment => self.get_typed::<Deployment>(key).await?.map(Into::into),
            ManagedKind::Service => self.get_typed::<Service>(key).await?.map(Into::into),
            ManagedKind::StatefulSet => self.get_typed::<StatefulSet>(key).await?.map(Into::into),
        })
    }

    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError> {
        addressable(object)?;
        let namespace = object.namespace();
        Ok(match object {
            ManagedObject::Deployment(d) => self.create_typed(namespace, d).await?.into(),
            ManagedObject::Service(s) => self.create_typed(namespace, s).await?.into(),
            ManagedObject::StatefulSet(s) => self.create_typed(namespace, s).await?.into(),
        })
    }

    async fn update(&self, object: &ManagedObject, mode: WriteMode) -> Result<ManagedObject, StoreError> {
        addressable(object)?;
        let (namespace, name) = (object.namespace(), object.name());
        Ok(match object {
            ManagedObject::Deployment(d) => self.replace_typed(namespace, name, d, mode).await?.into(),
            ManagedObject::Service(s) => self.replace_typed(namespace, name, s, mode).await?.into(),
            ManagedObject::StatefulSet(s) => self.replace_typed(namespace, name, s, mode).await?.into(),
        })
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        match key.kind {
            ManagedKind::Deployment => self.delete_typed::<Deployment>(key).await,
            ManagedKind::Service => self.delete_typed::<Service>(key).await,
            ManagedKind::StatefulSet => self.delete_typed::<StatefulSet>(key).await,
        }
    }

    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<MyAppResource>, StoreError> {
        debug!("Fetching MyAppResource {}/{}", namespace, name);
        Ok(self.api::<MyAppResource>(namespace).get_opt(name).await?)
    }

    async fn update_app_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MyAppResourceStatus,
    ) -> Result<(), StoreError> {
        let status_patch = serde_json::json!({
            "status": status
        });

        let mut params = PatchParams::default();
        params.field_manager = Some(self.field_manager.clone());
        self.api::<MyAppResource>(namespace)
            .patch_status(name, &params, &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }
}
