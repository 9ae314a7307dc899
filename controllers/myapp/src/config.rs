//! Controller configuration, read from environment variables.

use crate::error::ControllerError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";
const DEFAULT_FIELD_MANAGER: &str = "myapp-controller";
const DEFAULT_RESYNC_SECS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONCURRENCY: u16 = 3;
const DEFAULT_DEBOUNCE_SECS: u64 = 1;

/// Runtime configuration of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when `None`
    pub namespace: Option<String>,
    /// DNS domain of the cluster (`CLUSTER_DOMAIN`)
    pub cluster_domain: String,
    /// Requeue delay after a successful reconciliation; disabled when `None`
    pub resync_interval: Option<Duration>,
    /// Deadline of one reconciliation
    pub reconcile_timeout: Duration,
    /// Identities reconciled in parallel
    pub concurrency: u16,
    /// Quiet period before a burst of events triggers a reconcile
    pub debounce: Duration,
    /// Field manager recorded on every write
    pub field_manager: String,
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let resync_secs: u64 = parse(&lookup, "RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_SECS)?;
        let timeout_secs: u64 = parse(&lookup, "RECONCILE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            cluster_domain: text("CLUSTER_DOMAIN", DEFAULT_CLUSTER_DOMAIN),
            resync_interval: (resync_secs > 0).then(|| Duration::from_secs(resync_secs)),
            reconcile_timeout: Duration::from_secs(timeout_secs),
            concurrency: parse(&lookup, "RECONCILE_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            debounce: Duration::from_secs(parse(&lookup, "DEBOUNCE_SECS", DEFAULT_DEBOUNCE_SECS)?),
            field_manager: text("FIELD_MANAGER", DEFAULT_FIELD_MANAGER),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ControllerError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{key}={value:?} is not valid: {e}"))
        }),
    }
}
