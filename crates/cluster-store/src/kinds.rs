//! The closed set of object kinds the controller manages.
//!
//! Every managed object is one of a Deployment, a Service or a StatefulSet.
//! `ManagedObject` wraps the typed k8s-openapi value so that the syncer and
//! cleaner can run one generic algorithm over all of them.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;

/// Kind descriptor for a managed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagedKind {
    /// `apps/v1` Deployment
    Deployment,
    /// `v1` Service
    Service,
    /// `apps/v1` StatefulSet
    StatefulSet,
}

impl ManagedKind {
    /// Every managed kind, in watch registration order.
    pub const ALL: [ManagedKind; 3] = [
        ManagedKind::Deployment,
        ManagedKind::Service,
        ManagedKind::StatefulSet,
    ];

    /// Kubernetes `kind` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::StatefulSet => "StatefulSet",
        }
    }

    /// Top-level `spec` fields the API server allocates and owns.
    ///
    /// These never come from the desired definition and are left out of
    /// structural comparisons.
    pub fn server_owned_spec_fields(self) -> &'static [&'static str] {
        match self {
            Self::Service => &["clusterIP", "clusterIPs"],
            Self::Deployment | Self::StatefulSet => &[],
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a managed object in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Kind of the object
    pub kind: ManagedKind,
    /// Namespace the object lives in
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key for `kind` at `namespace/name`.
    pub fn new(kind: ManagedKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// A typed managed object
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedObject {
    /// A Deployment
    Deployment(Deployment),
    /// A Service
    Service(Service),
    /// A StatefulSet
    StatefulSet(StatefulSet),
}

impl ManagedObject {
    /// Kind descriptor of the wrapped object.
    pub fn kind(&self) -> ManagedKind {
        match self {
            Self::Deployment(_) => ManagedKind::Deployment,
            Self::Service(_) => ManagedKind::Service,
            Self::StatefulSet(_) => ManagedKind::StatefulSet,
        }
    }

    /// Object metadata.
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(d) => &d.metadata,
            Self::Service(s) => &s.metadata,
            Self::StatefulSet(s) => &s.metadata,
        }
    }

    /// Mutable object metadata.
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Deployment(d) => &mut d.metadata,
            Self::Service(s) => &mut s.metadata,
            Self::StatefulSet(s) => &mut s.metadata,
        }
    }

    /// Object name, empty when unset.
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Object namespace, empty when unset.
    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    /// Address of the object in the cluster.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.kind(), self.namespace(), self.name())
    }

    /// Resource version the object was read at, if any.
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata().resource_version.as_deref()
    }

    /// Carry over the resource version of a live object so an update is
    /// checked against the revision that was read.
    #[must_use]
    pub fn with_resource_version(mut self, resource_version: Option<String>) -> Self {
        self.metadata_mut().resource_version = resource_version;
        self
    }

    /// The `spec` section as JSON (`null` when the object has none).
    pub fn spec_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Deployment(d) => serde_json::to_value(&d.spec),
            Self::Service(s) => serde_json::to_value(&s.spec),
            Self::StatefulSet(s) => serde_json::to_value(&s.spec),
        }
    }
}

impl From<Deployment> for ManagedObject {
    fn from(deployment: Deployment) -> Self {
        Self::Deployment(deployment)
    }
}

impl From<Service> for ManagedObject {
    fn from(service: Service) -> Self {
        Self::Service(service)
    }
}

impl From<StatefulSet> for ManagedObject {
    fn from(stateful_set: StatefulSet) -> Self {
        Self::StatefulSet(stateful_set)
    }
}
