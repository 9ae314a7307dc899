//! Desired-state compiler
//!
//! Pure functions turning a `MyAppResourceSpec` into the objects that
//! should exist for it. Names depend only on the owning identity, never on
//! the spec body, so the deletion path can rebuild them from an empty spec.

pub mod labels;
pub mod podinfo;
pub mod redis;

use cluster_store::ManagedObject;
use crds::{MyAppResource, MyAppResourceSpec};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use std::fmt;

/// Namespace and name of an owning `MyAppResource`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppIdentity {
    /// Namespace of the resource and of every object it owns
    pub namespace: String,
    /// Resource name, the prefix of every owned object name
    pub name: String,
}

impl AppIdentity {
    /// Creates an identity from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a resource, `None` if it lacks a name or namespace.
    pub fn of(app: &MyAppResource) -> Option<Self> {
        Some(Self::new(
            app.metadata.namespace.as_deref()?,
            app.metadata.name.as_deref()?,
        ))
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Redis StatefulSet and its Service
#[derive(Debug, Clone, PartialEq)]
pub struct CacheObjects {
    /// `<name>-redis` StatefulSet
    pub stateful_set: StatefulSet,
    /// `<name>-redis` Service
    pub service: Service,
}

impl CacheObjects {
    /// The pair in sync and cleanup order.
    pub fn into_objects(self) -> [ManagedObject; 2] {
        [self.stateful_set.into(), self.service.into()]
    }
}

/// Everything that should exist for one specification
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// `<name>-podinfo` Deployment
    pub deployment: Deployment,
    /// `<name>-podinfo` Service
    pub service: Service,
    /// Only set when the cache is enabled
    pub cache: Option<CacheObjects>,
}

/// The cache pair for an identity, whether or not it is enabled.
pub fn cache_objects(identity: &AppIdentity) -> CacheObjects {
    CacheObjects {
        stateful_set: redis::stateful_set(identity),
        service: redis::service(identity),
    }
}

/// Compile the desired state of one specification.
pub fn compile(identity: &AppIdentity, spec: &MyAppResourceSpec, cluster_domain: &str) -> DesiredState {
    let cache_address = redis::service_address(identity, cluster_domain);
    DesiredState {
        deployment: podinfo::deployment(identity, spec, &cache_address),
        service: podinfo::service(identity),
        cache: spec.cache_enabled().then(|| cache_objects(identity)),
    }
}

/// All four objects that can exist for an identity.
///
/// Built from an empty spec; only the names and kinds matter to callers.
pub fn all_managed_objects(identity: &AppIdentity, cluster_domain: &str) -> Vec<ManagedObject> {
    let desired = compile(identity, &MyAppResourceSpec::default(), cluster_domain);
    let mut objects: Vec<ManagedObject> = vec![desired.deployment.into(), desired.service.into()];
    objects.extend(cache_objects(identity).into_objects());
    objects
}
