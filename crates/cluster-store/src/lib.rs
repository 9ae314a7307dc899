//! Cluster Object Store
//!
//! The boundary between the MyAppResource reconciliation engine and the
//! Kubernetes API server.
//!
//! # Example
//!
//! ```no_run
//! use cluster_store::{KubeStore, ManagedKind, ObjectKey, ObjectStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeStore::new(client, "myapp-controller");
//!
//! let key = ObjectKey::new(ManagedKind::Deployment, "default", "demo-podinfo");
//! match store.get(&key).await? {
//!     Some(live) => println!("found {} at {:?}", live.key(), live.resource_version()),
//!     None => println!("{key} does not exist yet"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Typed kinds**: Deployments, Services and StatefulSets behind one `ManagedObject`
//! - **Explicit absence**: lookups return `Option`, writes report `StoreError::NotFound`
//! - **Dry runs**: `WriteMode::DryRun` previews server-side defaulting without persisting
//! - **Cancellation**: `cancellable` races any call against a `CancellationToken`
//! - **Testing**: `MockStore` (feature `test-util`) emulates the API server in memory

pub mod client;
pub mod error;
pub mod kinds;
pub mod store;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeStore;
pub use error::StoreError;
pub use kinds::{ManagedKind, ManagedObject, ObjectKey};
pub use store::{ObjectStore, WriteMode, cancellable};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockStore, StoreCall, StoreOp};
