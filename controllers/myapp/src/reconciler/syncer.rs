//! Lookup-or-create, else dry-run, diff and update.
//!
//! One algorithm for every managed kind. At most one mutating call is made
//! per invocation and none when the live object already matches what the
//! API server would compute for the desired definition.

use super::diff::diff_spec;
use crate::error::SyncError;
use cluster_store::{ManagedObject, ObjectStore, WriteMode, cancellable};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What `sync_object` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The object did not exist and was created
    Created,
    /// The live object drifted and was replaced
    Updated,
    /// The live object already matched
    Unchanged,
}

/// Converge one managed object towards `desired`.
pub async fn sync_object(
    store: &dyn ObjectStore,
    cancel: &CancellationToken,
    desired: ManagedObject,
) -> Result<SyncOutcome, SyncError> {
    let key = desired.key();

    let live = cancellable(cancel, store.get(&key))
        .await
        .map_err(|source| SyncError::Lookup { key: key.clone(), source })?;

    let Some(live) = live else {
        cancellable(cancel, store.create(&desired))
            .await
            .map_err(|source| SyncError::Create { key: key.clone(), source })?;
        info!("Created {}", key);
        return Ok(SyncOutcome::Created);
    };

    let desired = desired.with_resource_version(live.resource_version().map(str::to_string));
    let preview = cancellable(cancel, store.update(&desired, WriteMode::DryRun))
        .await
        .map_err(|source| SyncError::DryRun { key: key.clone(), source })?;

    let diff = diff_spec(key.kind, &live, &preview)
        .map_err(|source| SyncError::Diff { key: key.clone(), source })?;
    if diff.is_empty() {
        debug!("{} is up to date", key);
        return Ok(SyncOutcome::Unchanged);
    }

    cancellable(cancel, store.update(&desired, WriteMode::Persist))
        .await
        .map_err(|source| SyncError::Update { key: key.clone(), source })?;
    info!("Updated {} (changed: {})", key, diff);
    Ok(SyncOutcome::Updated)
}
