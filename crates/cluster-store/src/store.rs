//! ObjectStore trait for mocking
//!
//! This trait abstracts the cluster API so the reconciliation engine can be
//! exercised against an in-memory store in unit tests. `KubeStore` is the
//! production implementation.

use crate::error::StoreError;
use crate::kinds::{ManagedObject, ObjectKey};
use crds::{MyAppResource, MyAppResourceStatus};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// How a write is executed by the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteMode {
    /// Commit the write
    Persist,
    /// Run admission and defaulting, return the result, persist nothing
    DryRun,
}

/// Per-kind object store operations
///
/// Every method is a single remote call. A missing object is reported as
/// `Ok(None)` by lookups and as `StoreError::NotFound` by writes.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up a managed object.
    async fn get(&self, key: &ObjectKey) -> Result<Option<ManagedObject>, StoreError>;

    /// Create a managed object.
    async fn create(&self, object: &ManagedObject) -> Result<ManagedObject, StoreError>;

    /// Replace a managed object, optionally as a dry run.
    async fn update(&self, object: &ManagedObject, mode: WriteMode) -> Result<ManagedObject, StoreError>;

    /// Delete a managed object.
    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;

    /// Look up the owning specification.
    async fn get_app(&self, namespace: &str, name: &str) -> Result<Option<MyAppResource>, StoreError>;

    /// Write the status subresource of the owning specification.
    async fn update_app_status(
        &self,
        namespace: &str,
        name: &str,
        status: &MyAppResourceStatus,
    ) -> Result<(), StoreError>;
}

/// Run one store call, giving up as soon as `cancel` fires.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StoreError::Cancelled),
        result = call => result,
    }
}
