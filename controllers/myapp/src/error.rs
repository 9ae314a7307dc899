//! Controller-specific error types.
//!
//! `SyncError` describes a failed step against one managed object and
//! `SyncErrors` collects the failures of one reconciliation without
//! stopping at the first. `ControllerError` is what reaches the watcher.

use cluster_store::{ObjectKey, StoreError};
use std::fmt;
use thiserror::Error;

/// A failed syncer or cleaner step on one managed object.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to look up {key}: {source}")]
    Lookup { key: ObjectKey, source: StoreError },

    #[error("failed to create {key}: {source}")]
    Create { key: ObjectKey, source: StoreError },

    #[error("dry-run update of {key} failed: {source}")]
    DryRun { key: ObjectKey, source: StoreError },

    #[error("failed to compare {key}: {source}")]
    Diff {
        key: ObjectKey,
        source: serde_json::Error,
    },

    #[error("failed to update {key}: {source}")]
    Update { key: ObjectKey, source: StoreError },

    #[error("failed to delete {key}: {source}")]
    Delete { key: ObjectKey, source: StoreError },
}

/// Ordered collection of step failures. Empty means success.
#[derive(Debug, Default)]
pub struct SyncErrors(Vec<SyncError>);

impl SyncErrors {
    /// Creates an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure.
    pub fn push(&mut self, error: SyncError) {
        self.0.push(error);
    }

    /// Append every failure of another aggregate.
    pub fn absorb(&mut self, other: SyncErrors) {
        self.0.extend(other.0);
    }

    /// Whether no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<(), SyncErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<SyncError> for SyncErrors {
    fn from(error: SyncError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for SyncErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncErrors {}

/// Errors that can occur in the MyApp Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Object store error outside of a sync step
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// The status subresource could not be written
    #[error("Failed to persist status of {app}: {source}")]
    StatusUpdate { app: String, source: StoreError },

    /// Managed objects of a deleted resource could not all be removed
    #[error("Cleanup of {app} failed: {source}")]
    Cleanup { app: String, source: SyncErrors },

    /// The reconciliation did not finish before its deadline
    #[error("Reconciliation of {0} timed out")]
    Timeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_store::ManagedKind;

    fn key(kind: ManagedKind, name: &str) -> ObjectKey {
        ObjectKey::new(kind, "ns", name)
    }

    #[test]
    fn test_sync_errors_join_with_newlines() {
        let mut errors = SyncErrors::new();
        assert!(errors.is_empty());
        errors.push(SyncError::Update {
            key: key(ManagedKind::Deployment, "demo-podinfo"),
            source: StoreError::Backend("denied".to_string()),
        });
        errors.push(SyncError::Delete {
            key: key(ManagedKind::StatefulSet, "demo-redis"),
            source: StoreError::Cancelled,
        });

        let rendered = errors.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("failed to update Deployment ns/demo-podinfo"));
        assert!(lines[0].contains("denied"));
        assert!(lines[1].starts_with("failed to delete StatefulSet ns/demo-redis"));
    }

    #[test]
    fn test_into_result() {
        assert!(SyncErrors::new().into_result().is_ok());

        let error = SyncError::Create {
            key: key(ManagedKind::Service, "demo-podinfo"),
            source: StoreError::Backend("boom".to_string()),
        };
        let errors = SyncErrors::from(error).into_result().unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
