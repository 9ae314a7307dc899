//! Prints the `MyAppResource` CustomResourceDefinition as YAML.
//!
//! ```text
//! cargo run -p crds --bin crdgen > config/crd/myappresources.yaml
//! ```

use crds::MyAppResource;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let manifest = serde_yaml::to_string(&MyAppResource::crd())?;
    print!("{manifest}");
    Ok(())
}
