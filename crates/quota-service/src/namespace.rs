//! A namespace: its named buckets, its optional default bucket, and the
//! idle-eviction watchers for its buckets.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, warn};

use crate::bucket::{Bucket, BucketFactory};
use crate::types::NamespaceConfig;

/// Owns a map of named buckets within one namespace, its configuration, its
/// optional namespace-default bucket, and the idle-eviction watchers for its
/// buckets.
///
/// `buckets` is guarded by one reader/writer lock. All mutation (creation
/// and eviction) goes through the write side; `Find`'s fast path uses the
/// paired read side.
pub struct Namespace {
    name: String,
    config: NamespaceConfig,
    buckets: RwLock<HashMap<String, Arc<dyn Bucket>>>,
    default_bucket: Option<Arc<dyn Bucket>>,
    factory: Arc<dyn BucketFactory>,
}

impl Namespace {
    /// Builds a namespace, eagerly constructing its default bucket and all
    /// statically configured named buckets, and starting their watchers.
    pub fn new(name: String, config: NamespaceConfig, factory: Arc<dyn BucketFactory>) -> Arc<Self> {
        let default_bucket = config
            .default_bucket
            .clone()
            .map(|cfg| factory.new_bucket(&name, crate::types::DEFAULT_BUCKET_NAME, cfg, false));

        let mut buckets = HashMap::new();
        for (bucket_name, bucket_cfg) in &config.buckets {
            let bucket = factory.new_bucket(&name, bucket_name, bucket_cfg.clone(), false);
            buckets.insert(bucket_name.clone(), bucket);
        }

        let ns = Arc::new(Self {
            name,
            config,
            buckets: RwLock::new(buckets),
            default_bucket,
            factory,
        });

        // Spawn watchers for every statically configured bucket that wants
        // idle eviction. Done after construction so each watcher holds a
        // clone of the now-complete Arc<Namespace>.
        let names: Vec<String> = ns.buckets.read().unwrap().keys().cloned().collect();
        for bucket_name in names {
            let bucket = ns.buckets.read().unwrap().get(&bucket_name).cloned();
            if let Some(bucket) = bucket {
                Self::maybe_spawn_watcher(ns.clone(), bucket_name, bucket);
            }
        }

        ns
    }

    /// The namespace's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace's configuration.
    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// Strictly checks the named-bucket map; the namespace default does not
    /// satisfy this. Takes the read lock (Open Question 3 resolved towards
    /// the strict behavior: Rust gives us no safe way to read a `RwLock`
    /// without acquiring it, and the read lock is cheap).
    pub fn exists(&self, name: &str) -> bool {
        self.buckets.read().unwrap().contains_key(name)
    }

    /// Read-locked lookup of a named bucket.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Bucket>> {
        self.buckets.read().unwrap().get(name).cloned()
    }

    /// The namespace's default bucket, if configured.
    pub fn default_bucket(&self) -> Option<Arc<dyn Bucket>> {
        self.default_bucket.clone()
    }

    /// Lazily creates a dynamic bucket for `name` from the namespace's
    /// template, subject to the dynamic-bucket cap. Standard
    /// check-lock-check: returns the existing bucket if another caller won
    /// the race, `None` if the cap is hit, or a newly created bucket.
    ///
    /// Returns `None` immediately if the namespace has no dynamic template.
    pub fn find_or_create_dynamic(self: &Arc<Self>, name: &str) -> Option<Arc<dyn Bucket>> {
        let template = self.config.dynamic_template.clone()?;

        let mut buckets = self.buckets.write().unwrap();

        if let Some(existing) = buckets.get(name) {
            return Some(existing.clone());
        }

        if self.config.max_dynamic_buckets > 0 {
            let dynamic_count = buckets.values().filter(|b| b.dynamic()).count() as i64;
            if dynamic_count >= self.config.max_dynamic_buckets {
                warn!(
                    namespace = %self.name,
                    name,
                    cap = self.config.max_dynamic_buckets,
                    "dynamic bucket cap reached, refusing to create"
                );
                return None;
            }
        }

        let bucket = self.factory.new_bucket(&self.name, name, template, true);
        bucket.report_activity();
        buckets.insert(name.to_string(), bucket.clone());
        drop(buckets);

        debug!(namespace = %self.name, name, "created dynamic bucket");
        Self::maybe_spawn_watcher(self.clone(), name.to_string(), bucket.clone());

        Some(bucket)
    }

    /// Lists bucket names currently present, sorted lexicographically (used
    /// by `BucketContainer::to_string` for deterministic dumps).
    pub fn bucket_names_sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    fn maybe_spawn_watcher(ns: Arc<Namespace>, name: String, bucket: Arc<dyn Bucket>) {
        let max_idle = bucket.config().max_idle_millis;
        if max_idle == 0 {
            return;
        }
        let period = Duration::from_millis(max_idle);
        tokio::spawn(async move {
            run_watcher(ns, name, bucket, period).await;
        });
    }
}

/// Ticks every `period`. On each tick, checks activity; if none was
/// reported since the last tick, removes the bucket from the namespace under
/// the write lock and destroys it.
///
/// Race rule (see spec §4.4): the activity flag is cleared *before* the
/// write lock is taken, so a `Take` landing in between is observed only on
/// the next tick — the bucket is evicted anyway. This is intentional:
/// eviction is best-effort, and a freshly evicted name simply triggers
/// lazy re-creation on the next lookup.
async fn run_watcher(ns: Arc<Namespace>, name: String, bucket: Arc<dyn Bucket>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await; // first tick fires immediately; a fresh bucket
                          // shouldn't be judged before it's had one full
                          // period to be used.

    loop {
        ticker.tick().await;

        if bucket.activity_detected() {
            continue;
        }

        let removed = {
            let mut buckets = ns.buckets.write().unwrap();
            match buckets.get(&name) {
                Some(existing) if Arc::ptr_eq(existing, &bucket) => {
                    buckets.remove(&name);
                    true
                }
                _ => false,
            }
        };

        if removed {
            debug!(namespace = %ns.name, name, "evicting idle bucket");
            bucket.destroy().await;
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::LocalBucketFactory;
    use crate::types::BucketConfig;
    use std::time::Duration as StdDuration;

    fn factory() -> Arc<dyn BucketFactory> {
        Arc::new(LocalBucketFactory::new())
    }

    #[tokio::test]
    async fn static_bucket_is_visible_and_exists() {
        let mut cfg = NamespaceConfig::default();
        cfg.buckets
            .insert("b1".to_string(), BucketConfig::new(100.0, 100, 0));
        let ns = Namespace::new("ns_a".to_string(), cfg, factory());
        assert!(ns.exists("b1"));
        assert!(ns.get("b1").is_some());
        assert!(!ns.exists("missing"));
    }

    #[tokio::test]
    async fn dynamic_cap_is_enforced() {
        let mut cfg = NamespaceConfig::default();
        cfg.dynamic_template = Some(BucketConfig::new(5.0, 5, 0));
        cfg.max_dynamic_buckets = 2;
        let ns = Namespace::new("ns_d".to_string(), cfg, factory());

        assert!(ns.find_or_create_dynamic("a").is_some());
        assert!(ns.find_or_create_dynamic("b").is_some());
        assert!(ns.find_or_create_dynamic("c").is_none());
    }

    #[tokio::test]
    async fn repeated_dynamic_lookup_returns_same_instance() {
        let mut cfg = NamespaceConfig::default();
        cfg.dynamic_template = Some(BucketConfig::new(5.0, 5, 0));
        let ns = Namespace::new("ns_d".to_string(), cfg, factory());

        let first = ns.find_or_create_dynamic("a").unwrap();
        let second = ns.find_or_create_dynamic("a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn idle_bucket_is_evicted_after_max_idle() {
        let mut cfg = NamespaceConfig::default();
        cfg.buckets
            .insert("b1".to_string(), BucketConfig::new(100.0, 100, 50));
        let ns = Namespace::new("ns_a".to_string(), cfg, factory());
        let bucket = ns.get("b1").unwrap();
        bucket.report_activity();

        tokio::time::sleep(StdDuration::from_millis(200)).await;

        // S6: absent from the namespace and destroyed exactly once.
        assert!(!ns.exists("b1"));
        let local = bucket
            .as_any()
            .downcast_ref::<crate::bucket::LocalBucket>()
            .unwrap();
        assert_eq!(local.destroy_count(), 1);
    }

    #[tokio::test]
    async fn touched_bucket_survives() {
        let mut cfg = NamespaceConfig::default();
        cfg.buckets
            .insert("b1".to_string(), BucketConfig::new(100.0, 100, 30));
        let ns = Namespace::new("ns_a".to_string(), cfg, factory());

        for _ in 0..6 {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
            if let Some(b) = ns.get("b1") {
                b.report_activity();
            }
        }

        assert!(ns.exists("b1"));
    }
}
