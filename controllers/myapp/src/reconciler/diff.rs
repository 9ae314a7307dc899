//! Structural comparison of object specs.
//!
//! Compares the `spec` sections of a live object and a candidate
//! replacement and reports the paths that differ. Fields the API server
//! allocates for a kind are left out of the comparison.

use cluster_store::{ManagedKind, ManagedObject};
use serde_json::{Map, Value};
use std::fmt;

/// Paths that differ between two specs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDiff {
    paths: Vec<String>,
}

impl SpecDiff {
    /// Whether the two specs are equivalent.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl fmt::Display for SpecDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.paths.join(", "))
    }
}

/// Diff the `spec` of `live` against the `spec` of `proposed`.
pub fn diff_spec(
    kind: ManagedKind,
    live: &ManagedObject,
    proposed: &ManagedObject,
) -> Result<SpecDiff, serde_json::Error> {
    let mut live = live.spec_value()?;
    let mut proposed = proposed.spec_value()?;
    for field in kind.server_owned_spec_fields() {
        for spec in [&mut live, &mut proposed] {
            if let Value::Object(map) = spec {
                map.remove(*field);
            }
        }
    }

    let mut diff = SpecDiff::default();
    walk("", &live, &proposed, &mut diff.paths);
    Ok(diff)
}

fn walk(path: &str, old: &Value, new: &Value, out: &mut Vec<String>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => walk_object(path, old, new, out),
        (Value::Array(old), Value::Array(new)) => {
            for (index, (old, new)) in old.iter().zip(new).enumerate() {
                walk(&format!("{path}[{index}]"), old, new, out);
            }
            if old.len() != new.len() {
                out.push(format!("{}.length", display_path(path)));
            }
        }
        _ => out.push(display_path(path).to_string()),
    }
}

fn walk_object(path: &str, old: &Map<String, Value>, new: &Map<String, Value>, out: &mut Vec<String>) {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let child = if path.is_empty() {
            key.clone()
        } else {
            format!("{path}.{key}")
        };
        // An absent key and an explicit null carry the same meaning.
        let old = old.get(key).unwrap_or(&Value::Null);
        let new = new.get(key).unwrap_or(&Value::Null);
        walk(&child, old, new, out);
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "spec" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
    use k8s_openapi::api::core::v1::{Service, ServiceSpec};

    fn deployment(spec: Option<DeploymentSpec>) -> ManagedObject {
        Deployment { spec, ..Default::default() }.into()
    }

    fn service(cluster_ip: &str, session_affinity: &str) -> ManagedObject {
        Service {
            spec: Some(ServiceSpec {
                cluster_ip: Some(cluster_ip.to_string()),
                cluster_ips: Some(vec![cluster_ip.to_string()]),
                session_affinity: Some(session_affinity.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn test_identical_specs() {
        let object = deployment(Some(DeploymentSpec { replicas: Some(2), ..Default::default() }));
        let diff = diff_spec(ManagedKind::Deployment, &object, &object.clone()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_scalar_change() {
        let live = deployment(Some(DeploymentSpec { replicas: Some(2), ..Default::default() }));
        let proposed = deployment(Some(DeploymentSpec { replicas: Some(3), ..Default::default() }));
        let diff = diff_spec(ManagedKind::Deployment, &live, &proposed).unwrap();
        assert_eq!(diff.to_string(), "replicas");
    }

    #[test]
    fn test_removed_field_is_reported() {
        let live = deployment(Some(DeploymentSpec { replicas: Some(2), ..Default::default() }));
        let proposed = deployment(Some(DeploymentSpec::default()));
        let diff = diff_spec(ManagedKind::Deployment, &live, &proposed).unwrap();
        assert_eq!(diff.to_string(), "replicas");
    }

    #[test]
    fn test_missing_spec() {
        let live = deployment(Some(DeploymentSpec::default()));
        let proposed = deployment(None);
        let diff = diff_spec(ManagedKind::Deployment, &live, &proposed).unwrap();
        assert_eq!(diff.to_string(), "spec");
    }

    #[test]
    fn test_array_paths() {
        let mut left = serde_json::json!({"containers": [{"image": "a"}, {"image": "b"}]});
        let right = serde_json::json!({"containers": [{"image": "c"}]});
        let mut out = Vec::new();
        walk("", &left, &right, &mut out);
        assert_eq!(out, vec!["containers[0].image", "containers.length"]);

        left = right.clone();
        out.clear();
        walk("", &left, &right, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_server_owned_service_fields_are_ignored() {
        let live = service("10.96.0.1", "None");
        let proposed = service("10.96.0.2", "None");
        assert!(diff_spec(ManagedKind::Service, &live, &proposed).unwrap().is_empty());

        let proposed = service("10.96.0.2", "ClientIP");
        let diff = diff_spec(ManagedKind::Service, &live, &proposed).unwrap();
        assert_eq!(diff.to_string(), "sessionAffinity");
    }
}
