//! MyAppResource CRD
//!
//! Declares a podinfo frontend (replicas, resources, image, UI options)
//! and an optional Redis cache backend.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "my.api.group",
    version = "v1alpha1",
    kind = "MyAppResource",
    namespaced,
    status = "MyAppResourceStatus",
    printcolumn = r#"{"name":"Valid","type":"boolean","jsonPath":".status.valid"}"#,
    printcolumn = r#"{"name":"Error","type":"string","jsonPath":".status.error"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MyAppResourceSpec {
    /// Number of frontend replicas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replica_count: Option<i32>,

    /// System resources for the frontend pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,

    /// Container image for the frontend pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    /// UI configuration for the frontend pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Ui>,

    /// Redis cache backend configuration
    #[serde(default, alias = "cache", skip_serializing_if = "Option::is_none")]
    pub redis: Option<Redis>,
}

/// Resource requirements for the frontend container.
///
/// Values use Kubernetes quantity syntax ("200m", "160Mi"). An empty
/// string means the corresponding entry is not set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// Memory limit for the frontend container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory_limit: String,

    /// CPU request for the frontend container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_request: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image repository, e.g. `ghcr.io/stefanprodan/podinfo`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,

    /// Image tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ui {
    /// UI color scheme
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,

    /// UI message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Redis {
    /// Whether the Redis backend is deployed
    #[serde(default)]
    pub enabled: bool,
}

impl MyAppResourceSpec {
    /// Full image reference (`repository:tag`).
    ///
    /// Returns `None` unless both parts are non-empty.
    pub fn image_reference(&self) -> Option<String> {
        let image = self.image.as_ref()?;
        if image.repository.is_empty() || image.tag.is_empty() {
            return None;
        }
        Some(format!("{}:{}", image.repository, image.tag))
    }

    /// Whether the Redis backend is requested.
    pub fn cache_enabled(&self) -> bool {
        self.redis.as_ref().is_some_and(|redis| redis.enabled)
    }
}

/// Observed state written back by the controller.
///
/// After a completed reconciliation either `valid` is true and `error` is
/// empty, or `valid` is false and `error` holds the failure message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyAppResourceStatus {
    #[serde(default)]
    pub valid: bool,

    #[serde(default)]
    pub error: String,
}

impl MyAppResourceStatus {
    /// Status for a reconciliation that converged without errors.
    pub fn converged() -> Self {
        Self {
            valid: true,
            error: String::new(),
        }
    }

    /// Status for a reconciliation that recorded at least one failure.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: error.into(),
        }
    }
}
