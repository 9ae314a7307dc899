//! Best-effort deletion of managed objects.

use crate::error::{SyncError, SyncErrors};
use cluster_store::{ManagedObject, ObjectStore, cancellable};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Delete every object in `objects`.
///
/// An object that is already gone counts as deleted. Every object is
/// attempted even after a failure; all failures are returned together.
pub async fn clean_objects(
    store: &dyn ObjectStore,
    cancel: &CancellationToken,
    objects: &[ManagedObject],
) -> Result<(), SyncErrors> {
    let mut errors = SyncErrors::new();

    for object in objects {
        let key = object.key();
        match cancellable(cancel, store.delete(&key)).await {
            Ok(()) => info!("Deleted {}", key),
            Err(e) if e.is_not_found() => debug!("{} already absent", key),
            Err(source) => {
                warn!("Failed to delete {}: {}", key, source);
                errors.push(SyncError::Delete { key, source });
            }
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{self, AppIdentity};
    use cluster_store::{MockStore, StoreOp};

    fn objects() -> Vec<ManagedObject> {
        compiler::all_managed_objects(&AppIdentity::new("ns", "demo"), "cluster.local")
    }

    #[tokio::test]
    async fn test_clean_removes_existing_objects() {
        let store = MockStore::new();
        for object in objects() {
            store.insert(object);
        }

        clean_objects(&store, &CancellationToken::new(), &objects()).await.unwrap();
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_tolerates_missing_objects() {
        let store = MockStore::new();
        let objects = objects();
        store.insert(objects[0].clone());

        clean_objects(&store, &CancellationToken::new(), &objects).await.unwrap();
        clean_objects(&store, &CancellationToken::new(), &objects).await.unwrap();
        assert_eq!(store.calls_of(StoreOp::Delete).len(), 8);
    }

    #[tokio::test]
    async fn test_clean_does_not_short_circuit() {
        let store = MockStore::new();
        for object in objects() {
            store.insert(object);
        }
        store.fail(StoreOp::Delete, "demo-podinfo", "forbidden");

        let errors = clean_objects(&store, &CancellationToken::new(), &objects())
            .await
            .unwrap_err();

        // Deployment and Service share the failing name; the redis pair is still removed.
        assert_eq!(errors.len(), 2);
        assert_eq!(store.calls_of(StoreOp::Delete).len(), 4);
        assert_eq!(store.object_count(), 2);
        assert!(errors.to_string().lines().all(|line| line.contains("forbidden")));
    }
}
