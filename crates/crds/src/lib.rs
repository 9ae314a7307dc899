//! MyAppResource CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the podinfo operator.

pub mod my_app_resource;

pub use my_app_resource::*;
