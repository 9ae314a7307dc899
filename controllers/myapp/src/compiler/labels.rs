//! Naming and label helpers shared by every managed object.

use std::collections::BTreeMap;

/// Label carrying the managed object's name
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
/// Label carrying the managed object's namespace
pub const NAMESPACE_LABEL: &str = "app.kubernetes.io/namespace";
/// Label carrying the version of a pinned component
pub const VERSION_LABEL: &str = "app.kubernetes.io/version";

/// Suffix of the podinfo Deployment and Service
pub const PODINFO_SUFFIX: &str = "podinfo";
/// Suffix of the Redis StatefulSet and Service
pub const REDIS_SUFFIX: &str = "redis";

/// Name of a managed object derived from its owner.
pub fn object_name(owner: &str, suffix: &str) -> String {
    format!("{owner}-{suffix}")
}

/// Owner name for a managed object name, if it follows the naming rule.
pub fn owner_name(object_name: &str) -> Option<&str> {
    [PODINFO_SUFFIX, REDIS_SUFFIX].iter().find_map(|suffix| {
        object_name
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('-'))
            .filter(|owner| !owner.is_empty())
    })
}

/// Common label set used both to tag objects and to select their pods.
pub fn default_labels(name: &str, namespace: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (NAME_LABEL.to_string(), name.to_string()),
        (NAMESPACE_LABEL.to_string(), namespace.to_string()),
    ])
}

/// Merge label maps; later maps win on key collisions.
pub fn merge_labels<'a>(
    all: impl IntoIterator<Item = &'a BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    all.into_iter()
        .flat_map(|labels| labels.iter().map(|(k, v)| (k.clone(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_round_trip() {
        assert_eq!(object_name("demo", PODINFO_SUFFIX), "demo-podinfo");
        assert_eq!(owner_name("demo-podinfo"), Some("demo"));
        assert_eq!(owner_name("demo-redis"), Some("demo"));
        assert_eq!(owner_name("my-app-redis"), Some("my-app"));
    }

    #[test]
    fn test_owner_name_rejects_foreign_objects() {
        assert_eq!(owner_name("coredns"), None);
        assert_eq!(owner_name("-podinfo"), None);
        assert_eq!(owner_name("podinfo"), None);
        assert_eq!(owner_name("demoredis"), None);
    }

    #[test]
    fn test_default_labels() {
        let labels = default_labels("demo-podinfo", "ns");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[NAME_LABEL], "demo-podinfo");
        assert_eq!(labels[NAMESPACE_LABEL], "ns");
    }

    #[test]
    fn test_merge_labels_later_wins() {
        let base = default_labels("demo-redis", "ns");
        let extra = BTreeMap::from([
            (VERSION_LABEL.to_string(), "7.2.4".to_string()),
            (NAME_LABEL.to_string(), "override".to_string()),
        ]);
        let merged = merge_labels([&base, &extra]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[NAME_LABEL], "override");
        assert_eq!(merged[VERSION_LABEL], "7.2.4");
    }
}
