#![warn(missing_docs)]

//! Quota service: namespace/bucket token-bucket rate-limiting engine and its
//! gRPC facade.
//!
//! [`BucketContainer`] is the top-level registry; it resolves
//! `(namespace, name)` identities to [`Bucket`] instances via
//! [`Namespace`], honoring static configuration, lazily-created dynamic
//! buckets, and per-bucket idle eviction. [`QuotaService`] is the stateless
//! facade an RPC handler calls.

/// Non-blocking, coalesced "touched since last check" latch.
pub mod activity;
/// The `Bucket`/`BucketFactory` contracts and the in-process backend.
pub mod bucket;
/// Command-line interface.
pub mod cli;
/// On-disk configuration loading.
pub mod config;
/// Top-level bucket registry.
pub mod container;
/// Error kinds surfaced by the facade.
pub mod error;
/// Owns a namespace's buckets and their idle-eviction watchers.
pub mod namespace;
/// Stateless facade between transport and the container.
pub mod service;
/// The gRPC transport adapter.
pub mod transport;
/// Core configuration types and bucket identity.
pub mod types;

pub use activity::ActivitySignal;
pub use bucket::{Bucket, BucketFactory, LocalBucket, LocalBucketFactory, Wait};
pub use container::BucketContainer;
pub use error::QuotaError;
pub use namespace::Namespace;
pub use service::{AllowResult, QuotaService};
pub use types::{BucketConfig, NamespaceConfig, ServiceConfig, DEFAULT_BUCKET_NAME, GLOBAL_NAMESPACE};
