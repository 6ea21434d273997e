//! Top-level bucket registry: resolves (namespace, name) -> Bucket using the
//! fallback cascade, enforces the dynamic-bucket cap, and instantiates
//! buckets through a [`BucketFactory`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::bucket::{Bucket, BucketFactory};
use crate::namespace::Namespace;
use crate::types::{ServiceConfig, GLOBAL_NAMESPACE};

/// Resolves bucket identities to concrete [`Bucket`]s. Immutable after
/// construction: `namespaces` is built once and never mutated, so the
/// container itself needs no lock of its own.
pub struct BucketContainer {
    namespaces: HashMap<String, Arc<Namespace>>,
    global_default: Option<Arc<dyn Bucket>>,
}

impl BucketContainer {
    /// Builds the container from `config`, initializing `factory` and
    /// eagerly constructing every static bucket (global default, namespace
    /// defaults, named buckets).
    pub async fn new(
        config: ServiceConfig,
        factory: Arc<dyn BucketFactory>,
    ) -> Result<Arc<Self>, crate::error::QuotaError> {
        config
            .validate()
            .map_err(crate::error::QuotaError::Failed)?;

        factory.init(&config).await?;

        let global_default = config
            .global_default
            .clone()
            .map(|cfg| factory.new_bucket(GLOBAL_NAMESPACE, crate::types::DEFAULT_BUCKET_NAME, cfg, false));

        let mut namespaces = HashMap::new();
        for (name, ns_config) in config.namespaces {
            let ns = Namespace::new(name.clone(), ns_config, factory.clone());
            namespaces.insert(name, ns);
        }

        Ok(Arc::new(Self {
            namespaces,
            global_default,
        }))
    }

    /// Resolution cascade:
    /// 1. Unconfigured namespace -> global default (maybe `None`).
    /// 2. Namespace has the named bucket -> that bucket.
    /// 3. Namespace has a dynamic template -> lazily created bucket (maybe
    ///    `None` if the cap is hit).
    /// 4. Otherwise -> the namespace's default bucket (maybe `None`).
    ///
    /// On any non-`None` return, reports activity on the returned bucket
    /// before returning it.
    pub fn find(&self, namespace: &str, name: &str) -> Option<Arc<dyn Bucket>> {
        let ns = match self.namespaces.get(namespace) {
            Some(ns) => ns,
            None => {
                return self.touch(self.global_default.clone());
            }
        };

        if let Some(bucket) = ns.get(name) {
            return self.touch(Some(bucket));
        }

        if ns.config().dynamic_template.is_some() {
            return self.touch(ns.find_or_create_dynamic(name));
        }

        self.touch(ns.default_bucket())
    }

    /// Strictly checks the namespace's named-bucket map; does not fall back
    /// to any default.
    pub fn exists(&self, namespace: &str, name: &str) -> bool {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.exists(name))
            .unwrap_or(false)
    }

    fn touch(&self, bucket: Option<Arc<dyn Bucket>>) -> Option<Arc<dyn Bucket>> {
        if let Some(ref b) = bucket {
            b.report_activity();
        }
        bucket
    }
}

impl fmt::Display for BucketContainer {
    /// Deterministic textual dump: namespaces and bucket names are listed in
    /// lexicographic order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "global_default: {}",
            if self.global_default.is_some() {
                "present"
            } else {
                "none"
            }
        )?;

        let mut ns_names: Vec<&String> = self.namespaces.keys().collect();
        ns_names.sort();

        for ns_name in ns_names {
            let ns = &self.namespaces[ns_name];
            writeln!(
                f,
                "namespace {ns_name}: default={}",
                if ns.default_bucket().is_some() {
                    "present"
                } else {
                    "none"
                }
            )?;
            for bucket_name in ns.bucket_names_sorted() {
                writeln!(f, "  bucket {bucket_name}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::LocalBucketFactory;
    use crate::types::{BucketConfig, NamespaceConfig};

    fn factory() -> Arc<dyn BucketFactory> {
        Arc::new(LocalBucketFactory::new())
    }

    async fn build(config: ServiceConfig) -> Arc<BucketContainer> {
        BucketContainer::new(config, factory()).await.unwrap()
    }

    // S1
    #[tokio::test]
    async fn lookup_fallback_no_template_no_global() {
        let mut ns_a = NamespaceConfig::default();
        ns_a.buckets
            .insert("b1".to_string(), BucketConfig::new(100.0, 100, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_a".to_string(), ns_a);

        let container = build(config).await;

        assert!(container.find("ns_a", "b1").is_some());
        assert!(container.find("ns_a", "x").is_none());
        assert!(container.find("ns_z", "b1").is_none());
    }

    // S2
    #[tokio::test]
    async fn lookup_falls_back_to_global_default() {
        let mut ns_a = NamespaceConfig::default();
        ns_a.buckets
            .insert("b1".to_string(), BucketConfig::new(100.0, 100, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_a".to_string(), ns_a);
        config.global_default = Some(BucketConfig::new(10.0, 10, 0));

        let container = build(config).await;

        assert!(container.find("ns_z", "anything").is_some());
    }

    // S3
    #[tokio::test]
    async fn dynamic_cap_across_distinct_names() {
        let mut ns_d = NamespaceConfig::default();
        ns_d.dynamic_template = Some(BucketConfig::new(5.0, 5, 0));
        ns_d.max_dynamic_buckets = 2;
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_d".to_string(), ns_d);

        let container = build(config).await;

        let a = container.find("ns_d", "a").unwrap();
        let b = container.find("ns_d", "b").unwrap();
        assert!(a.dynamic());
        assert!(b.dynamic());
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(container.find("ns_d", "c").is_none());
    }

    #[tokio::test]
    async fn lookup_fallback_namespace_default() {
        let mut ns_a = NamespaceConfig::default();
        ns_a.default_bucket = Some(BucketConfig::new(1.0, 1, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_a".to_string(), ns_a);

        let container = build(config).await;

        assert!(container.find("ns_a", "unconfigured").is_some());
    }

    #[tokio::test]
    async fn no_defaults_anywhere_returns_none() {
        let container = build(ServiceConfig::default()).await;
        assert!(container.find("ns_nope", "anything").is_none());
    }

    #[tokio::test]
    async fn exists_does_not_consider_defaults() {
        let mut ns_a = NamespaceConfig::default();
        ns_a.default_bucket = Some(BucketConfig::new(1.0, 1, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_a".to_string(), ns_a);

        let container = build(config).await;

        assert!(!container.exists("ns_a", "unconfigured"));
    }

    #[tokio::test]
    async fn concurrent_find_yields_same_dynamic_bucket() {
        let mut ns_d = NamespaceConfig::default();
        ns_d.dynamic_template = Some(BucketConfig::new(5.0, 5, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_d".to_string(), ns_d);

        let container = build(config).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let container = container.clone();
            handles.push(tokio::spawn(async move { container.find("ns_d", "shared") }));
        }
        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap().unwrap());
        }
        for b in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], b));
        }
    }

    #[tokio::test]
    async fn string_dump_is_sorted() {
        let mut ns_b = NamespaceConfig::default();
        ns_b.buckets
            .insert("zeta".to_string(), BucketConfig::new(1.0, 1, 0));
        ns_b.buckets
            .insert("alpha".to_string(), BucketConfig::new(1.0, 1, 0));
        let mut config = ServiceConfig::default();
        config.namespaces.insert("ns_b".to_string(), ns_b);
        config
            .namespaces
            .insert("ns_a".to_string(), NamespaceConfig::default());

        let container = build(config).await;
        let dump = container.to_string();

        let ns_a_pos = dump.find("namespace ns_a").unwrap();
        let ns_b_pos = dump.find("namespace ns_b").unwrap();
        let alpha_pos = dump.find("bucket alpha").unwrap();
        let zeta_pos = dump.find("bucket zeta").unwrap();
        assert!(ns_a_pos < ns_b_pos);
        assert!(alpha_pos < zeta_pos);
    }

    #[tokio::test]
    async fn rejects_reserved_global_namespace_name() {
        let mut config = ServiceConfig::default();
        config
            .namespaces
            .insert(crate::types::GLOBAL_NAMESPACE.to_string(), NamespaceConfig::default());

        let err = BucketContainer::new(config, factory()).await.unwrap_err();
        assert!(matches!(err, crate::error::QuotaError::Failed(_)));
    }
}
