//! Test utilities for unit testing the reconciler
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::reconciler::Reconciler;
use cluster_store::MockStore;
use crds::{Image, MyAppResource, MyAppResourceSpec, Redis, Ui};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::Arc;

/// Helper to create a test MyAppResource
pub fn create_test_app(name: &str, namespace: &str, spec: MyAppResourceSpec) -> MyAppResource {
    MyAppResource {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

/// The `demo` spec: three replicas of podinfo with a UI color
pub fn demo_spec(cache_enabled: bool) -> MyAppResourceSpec {
    MyAppResourceSpec {
        replica_count: Some(3),
        image: Some(Image {
            repository: "ghcr.io/x/podinfo".to_string(),
            tag: "latest".to_string(),
        }),
        ui: Some(Ui {
            color: "#123456".to_string(),
            message: String::new(),
        }),
        redis: Some(Redis {
            enabled: cache_enabled,
        }),
        ..Default::default()
    }
}

/// Helper to create a reconciler over a mock store, without periodic resync
pub fn create_test_reconciler(store: &MockStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()), "cluster.local", None)
}
