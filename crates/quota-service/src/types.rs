//! Core data model: configuration types and bucket identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace name reserved for the global default bucket. Not usable as a
/// configured namespace key.
pub const GLOBAL_NAMESPACE: &str = "GLOBAL";

/// Bucket name reserved for a namespace's default bucket. Not usable as a
/// configured named-bucket key.
pub const DEFAULT_BUCKET_NAME: &str = "DEFAULT";

/// Tunables a [`crate::bucket::BucketFactory`] needs to build a bucket.
///
/// `extra` carries back-end-specific fields opaquely; the core never reads
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Tokens added per second.
    pub rate_per_sec: f64,
    /// Bucket capacity / burst size, in tokens.
    pub capacity: u64,
    /// Idle duration after which an unused bucket is evicted. 0 means never.
    #[serde(default)]
    pub max_idle_millis: u64,
    /// Back-end-specific passthrough fields.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl BucketConfig {
    /// Convenience constructor for tests and defaults lacking extra fields.
    pub fn new(rate_per_sec: f64, capacity: u64, max_idle_millis: u64) -> Self {
        Self {
            rate_per_sec,
            capacity,
            max_idle_millis,
            extra: BTreeMap::new(),
        }
    }
}

/// Configuration for one namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Fallback bucket used when a lookup misses and no dynamic template
    /// applies.
    #[serde(default)]
    pub default_bucket: Option<BucketConfig>,
    /// Template used to build buckets lazily on first lookup for an unknown
    /// name.
    #[serde(default)]
    pub dynamic_template: Option<BucketConfig>,
    /// Cap on the number of dynamic buckets live at once. <= 0 means
    /// unbounded.
    #[serde(default)]
    pub max_dynamic_buckets: i64,
    /// Statically configured named buckets.
    #[serde(default)]
    pub buckets: BTreeMap<String, BucketConfig>,
}

/// Top-level, immutable-after-load service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Global fallback bucket used for namespaces that aren't configured at
    /// all.
    #[serde(default)]
    pub global_default: Option<BucketConfig>,
    /// Namespace name -> configuration.
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceConfig>,
    /// Default caller patience (`maxWait`) used by the facade when a request
    /// does not override it. Milliseconds.
    #[serde(default = "default_max_wait_millis")]
    pub default_max_wait_millis: u64,
}

fn default_max_wait_millis() -> u64 {
    0
}

impl ServiceConfig {
    /// Validates the reserved-identifier invariant from the data model
    /// (namespace name `GLOBAL` and bucket name `DEFAULT` are carved out of
    /// the user namespace).
    pub fn validate(&self) -> Result<(), String> {
        if self.namespaces.contains_key(GLOBAL_NAMESPACE) {
            return Err(format!(
                "namespace name '{GLOBAL_NAMESPACE}' is reserved for the global default and cannot be configured"
            ));
        }
        for (ns_name, ns) in &self.namespaces {
            if ns.buckets.contains_key(DEFAULT_BUCKET_NAME) {
                return Err(format!(
                    "namespace '{ns_name}': bucket name '{DEFAULT_BUCKET_NAME}' is reserved for the namespace default and cannot be a named bucket"
                ));
            }
        }
        Ok(())
    }
}
