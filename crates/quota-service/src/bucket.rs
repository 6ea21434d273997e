//! The `Bucket` and `BucketFactory` contracts, plus a concrete in-process
//! backend (`LocalBucket`).
//!
//! The wait-time contract (see [`Wait`]) is the entire reason `Take` is not
//! a bare boolean: it pushes wait policy to the caller and keeps the server
//! stateless about waiters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::activity::ActivitySignal;
use crate::types::BucketConfig;

/// Outcome of [`Bucket::take`], as signed nanoseconds.
///
/// - `>= 0`: granted; the caller SHOULD sleep that long before using the
///   tokens (0 means immediately).
/// - `< 0`: not granted within the caller's patience; treat as rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait(pub i64);

impl Wait {
    /// Granted, no wait.
    pub const IMMEDIATE: Wait = Wait(0);
    /// Not granted within the caller's budget.
    pub const REJECTED: Wait = Wait(-1);

    /// Builds a granted-with-delay wait from a duration.
    pub fn granted_after(d: Duration) -> Self {
        Wait(d.as_nanos().min(i64::MAX as u128) as i64)
    }

    /// True if tokens were granted (possibly with a sleep hint).
    pub fn is_granted(&self) -> bool {
        self.0 >= 0
    }

    /// Converts to milliseconds for the RPC surface. The core computes wait
    /// in nanoseconds for precision; the wire contract is milliseconds (see
    /// DESIGN.md, Open Question 1).
    pub fn as_millis(&self) -> i64 {
        if self.0 < 0 {
            self.0
        } else {
            self.0 / 1_000_000
        }
    }
}

/// A per-bucket token-rate-limiting primitive, identified externally by
/// (namespace, name). Implementations are pluggable; this crate ships one,
/// [`LocalBucket`].
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Requests `n` tokens (negative means "return tokens"). `max_wait` of
    /// `Duration::ZERO` means "tell me the wait you'd impose, don't reject".
    /// Must be safe under concurrent calls and must report activity on
    /// every call, granted or not.
    async fn take(&self, n: i64, max_wait: Duration) -> Wait;

    /// The config this bucket was built from.
    fn config(&self) -> &BucketConfig;

    /// Whether this bucket was created from a dynamic template.
    fn dynamic(&self) -> bool;

    /// Idempotent release of back-end resources. Only the namespace's
    /// watcher may call this.
    async fn destroy(&self);

    /// The bucket's activity latch.
    fn activity(&self) -> &ActivitySignal;

    /// Convenience wrapper over `activity().report_activity()`.
    fn report_activity(&self) {
        self.activity().report_activity();
    }

    /// Convenience wrapper over `activity().activity_detected()`.
    fn activity_detected(&self) -> bool {
        self.activity().activity_detected()
    }

    /// Narrows to the concrete backend type; used by tests that need to
    /// observe backend-specific state (e.g. `LocalBucket::destroy_count`).
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Constructs [`Bucket`] instances bound to a (namespace, name, config,
/// dynamic?) identity. The core assumes exactly one factory per container.
#[async_trait]
pub trait BucketFactory: Send + Sync {
    /// One-time configuration; may establish back-end resources (e.g. a
    /// shared-datastore connection or a registered script).
    async fn init(&self, config: &crate::types::ServiceConfig) -> Result<(), crate::error::QuotaError>;

    /// Builds a fully usable bucket. Must never fail for a valid config.
    fn new_bucket(
        &self,
        namespace: &str,
        name: &str,
        config: BucketConfig,
        dynamic: bool,
    ) -> std::sync::Arc<dyn Bucket>;
}

struct LocalState {
    /// Tokens available, as a signed reservation ledger: can go negative
    /// when a request is granted a future wait.
    tokens: f64,
    last_refill: std::time::Instant,
}

/// An in-process token bucket. Refill-on-access arithmetic under a single
/// mutex, generalized from a per-client rate limiter to honor the
/// wait/reject contract of [`Bucket::take`].
pub struct LocalBucket {
    config: BucketConfig,
    dynamic: bool,
    state: Mutex<LocalState>,
    activity: ActivitySignal,
    destroyed: AtomicU64,
}

impl LocalBucket {
    /// Creates a fresh, full bucket.
    pub fn new(config: BucketConfig, dynamic: bool) -> Self {
        let capacity = config.capacity as f64;
        Self {
            config,
            dynamic,
            state: Mutex::new(LocalState {
                tokens: capacity,
                last_refill: std::time::Instant::now(),
            }),
            activity: ActivitySignal::new(),
            destroyed: AtomicU64::new(0),
        }
    }

    /// Number of times `destroy` has been called; used by tests to assert
    /// idempotency / exactly-once eviction.
    pub fn destroy_count(&self) -> u64 {
        self.destroyed.load(Ordering::Acquire)
    }

    fn refill_locked(&self, state: &mut LocalState) {
        let now = std::time::Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.last_refill = now;
        if elapsed <= 0.0 {
            return;
        }
        let capacity = self.config.capacity as f64;
        state.tokens = (state.tokens + elapsed * self.config.rate_per_sec).min(capacity);
    }
}

#[async_trait]
impl Bucket for LocalBucket {
    async fn take(&self, n: i64, max_wait: Duration) -> Wait {
        self.activity.report_activity();

        let mut state = self.state.lock().unwrap();
        self.refill_locked(&mut state);

        let new_tokens = state.tokens - n as f64;
        if new_tokens >= 0.0 {
            state.tokens = new_tokens.min(self.config.capacity as f64);
            return Wait::IMMEDIATE;
        }

        if self.config.rate_per_sec <= 0.0 {
            // No refill possible; the deficit can never be made up.
            return Wait::REJECTED;
        }

        let deficit = -new_tokens;
        let wait_secs = deficit / self.config.rate_per_sec;
        let wait = Wait::granted_after(Duration::from_secs_f64(wait_secs));

        if max_wait == Duration::ZERO || wait.0 as u128 <= max_wait.as_nanos() {
            state.tokens = new_tokens;
            wait
        } else {
            // Not honored: roll back the reservation so the caller isn't
            // permanently penalized for a rejected request.
            Wait::REJECTED
        }
    }

    fn config(&self) -> &BucketConfig {
        &self.config
    }

    fn dynamic(&self) -> bool {
        self.dynamic
    }

    async fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::AcqRel);
    }

    fn activity(&self) -> &ActivitySignal {
        &self.activity
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Builds [`LocalBucket`]s. Holds no shared state of its own: the in-process
/// backend has nothing to share across buckets.
#[derive(Default)]
pub struct LocalBucketFactory;

impl LocalBucketFactory {
    /// Creates a new factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BucketFactory for LocalBucketFactory {
    async fn init(&self, _config: &crate::types::ServiceConfig) -> Result<(), crate::error::QuotaError> {
        Ok(())
    }

    fn new_bucket(
        &self,
        _namespace: &str,
        _name: &str,
        config: BucketConfig,
        dynamic: bool,
    ) -> std::sync::Arc<dyn Bucket> {
        std::sync::Arc::new(LocalBucket::new(config, dynamic))
    }
}
