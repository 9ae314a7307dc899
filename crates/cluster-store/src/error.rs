//! Object store errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster object store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Kubernetes API error (transport, admission, conflict, ...)
    #[error("Kubernetes API error: {0}")]
    Api(kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic failure reported by a non-Kubernetes backend
    #[error("Object store error: {0}")]
    Backend(String),

    /// Object is missing data the store needs to address it
    #[error("Invalid object: {0}")]
    Invalid(String),

    /// The invocation was cancelled before the call completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Whether this error only signals that the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(ref response) if response.code == 404 => {
                Self::NotFound(response.message.clone())
            }
            other => Self::Api(other),
        }
    }
}
