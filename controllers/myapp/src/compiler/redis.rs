//! Redis cache backend: StatefulSet and Service definitions.

use super::AppIdentity;
use super::labels::{REDIS_SUFFIX, VERSION_LABEL, default_labels, merge_labels, object_name};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, ExecAction, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PodSpec, PodTemplateSpec, Probe, Service, ServicePort, ServiceSpec, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

pub const VERSION: &str = "7.2.4";
pub const PORT_NAME: &str = "redis";
pub const PORT: i32 = 6379;

const DATA_VOLUME: &str = "redis-data";
const DATA_PATH: &str = "/data";
const STORAGE_CLASS: &str = "standard";
const STORAGE_REQUEST: &str = "1Gi";

/// Address handed to the frontend as its cache server.
pub fn service_address(identity: &AppIdentity, cluster_domain: &str) -> String {
    format!(
        "tcp://{}.{}.svc.{}:{}",
        object_name(&identity.name, REDIS_SUFFIX),
        identity.namespace,
        cluster_domain,
        PORT
    )
}

fn ping_probe() -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "redis-cli ping".to_string(),
            ]),
        }),
        ..Default::default()
    }
}

/// Build the single-replica Redis StatefulSet.
pub fn stateful_set(identity: &AppIdentity) -> StatefulSet {
    let name = object_name(&identity.name, REDIS_SUFFIX);
    let labels = default_labels(&name, &identity.namespace);
    let version = BTreeMap::from([(VERSION_LABEL.to_string(), VERSION.to_string())]);

    let container = Container {
        name: name.clone(),
        image: Some(format!("docker.io/redis:{VERSION}")),
        ports: Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: DATA_PATH.to_string(),
            read_only: Some(false),
            ..Default::default()
        }]),
        liveness_probe: Some(ping_probe()),
        readiness_probe: Some(ping_probe()),
        termination_message_path: Some("/dev/termination-log".to_string()),
        termination_message_policy: Some("File".to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        ..Default::default()
    };

    let claim = PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(DATA_VOLUME.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            storage_class_name: Some(STORAGE_CLASS.to_string()),
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(STORAGE_REQUEST.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    StatefulSet {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(identity.namespace.clone()),
            labels: Some(merge_labels([&labels, &version])),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some("Always".to_string()),
                    dns_policy: Some("ClusterFirst".to_string()),
                    ..Default::default()
                }),
            },
            volume_claim_templates: Some(vec![claim]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the Redis Service.
pub fn service(identity: &AppIdentity) -> Service {
    let name = object_name(&identity.name, REDIS_SUFFIX);
    let labels = default_labels(&name, &identity.namespace);
    Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(identity.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                port: PORT,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
