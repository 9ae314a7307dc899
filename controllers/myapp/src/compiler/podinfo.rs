//! podinfo frontend: Deployment and Service definitions.

use super::AppIdentity;
use super::labels::{PODINFO_SUFFIX, default_labels, object_name};
use crds::MyAppResourceSpec;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub const PORT_NAME: &str = "http";
pub const PORT: i32 = 9898;

pub const ENV_UI_COLOR: &str = "PODINFO_UI_COLOR";
pub const ENV_UI_MESSAGE: &str = "PODINFO_UI_MESSAGE";
pub const ENV_CACHE_SERVER: &str = "PODINFO_CACHE_SERVER";

fn metadata(identity: &AppIdentity) -> ObjectMeta {
    let name = object_name(&identity.name, PODINFO_SUFFIX);
    ObjectMeta {
        labels: Some(default_labels(&name, &identity.namespace)),
        name: Some(name),
        namespace: Some(identity.namespace.clone()),
        ..Default::default()
    }
}

/// Build the frontend Deployment.
///
/// Without both an image repository and tag the Deployment carries metadata
/// only, so no pod template with an empty image is ever submitted.
pub fn deployment(identity: &AppIdentity, spec: &MyAppResourceSpec, cache_address: &str) -> Deployment {
    let metadata = metadata(identity);
    let Some(image) = spec.image_reference() else {
        return Deployment {
            metadata,
            ..Default::default()
        };
    };

    let name = object_name(&identity.name, PODINFO_SUFFIX);
    let labels = default_labels(&name, &identity.namespace);

    let container = Container {
        name: name.clone(),
        image: Some(image),
        ports: Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env: env_vars(spec, cache_address),
        resources: resource_requirements(spec),
        ..Default::default()
    };

    Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: spec.replica_count,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(name),
                    namespace: Some(identity.namespace.clone()),
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the frontend Service.
pub fn service(identity: &AppIdentity) -> Service {
    let metadata = metadata(identity);
    let selector = metadata.labels.clone();
    Service {
        metadata,
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector,
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                port: PORT,
                target_port: Some(IntOrString::String(PORT_NAME.to_string())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Environment for the frontend container, `None` when nothing is set.
///
/// The cache address is only passed when UI options are present and the
/// cache is enabled.
fn env_vars(spec: &MyAppResourceSpec, cache_address: &str) -> Option<Vec<EnvVar>> {
    let ui = spec.ui.as_ref()?;
    let mut env = Vec::new();

    let mut push = |name: &str, value: &str| {
        if !value.is_empty() {
            env.push(EnvVar {
                name: name.to_string(),
                value: Some(value.to_string()),
                ..Default::default()
            });
        }
    };
    push(ENV_UI_COLOR, &ui.color);
    push(ENV_UI_MESSAGE, &ui.message);
    if spec.cache_enabled() {
        push(ENV_CACHE_SERVER, cache_address);
    }

    (!env.is_empty()).then_some(env)
}

/// Requests and limits for the set quantities only.
fn resource_requirements(spec: &MyAppResourceSpec) -> Option<ResourceRequirements> {
    let resources = spec.resources.as_ref()?;
    let single = |key: &str, value: &str| {
        (!value.is_empty()).then(|| BTreeMap::from([(key.to_string(), Quantity(value.to_string()))]))
    };

    let requests = single("cpu", &resources.cpu_request);
    let limits = single("memory", &resources.memory_limit);
    if requests.is_none() && limits.is_none() {
        return None;
    }
    Some(ResourceRequirements {
        requests,
        limits,
        ..Default::default()
    })
}
