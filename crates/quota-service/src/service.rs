//! Stateless glue between the transport layer and [`BucketContainer`].

use std::sync::Arc;
use std::time::Duration;

use crate::bucket::Wait;
use crate::container::BucketContainer;
use crate::error::QuotaError;

/// The outcome of a successful `Allow` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowResult {
    /// Tokens granted (equal to the request's `n_tokens`).
    pub granted_tokens: i64,
    /// How long the caller should sleep before using the tokens. Zero means
    /// immediately.
    pub wait: Duration,
}

/// Single-operation facade: resolves a bucket and calls `Take` with the
/// caller's wait budget.
pub struct QuotaService {
    container: Arc<BucketContainer>,
    default_max_wait: Duration,
}

impl QuotaService {
    /// Builds a facade over `container`, using `default_max_wait` whenever a
    /// caller doesn't override it.
    pub fn new(container: Arc<BucketContainer>, default_max_wait: Duration) -> Self {
        Self {
            container,
            default_max_wait,
        }
    }

    /// Resolves (namespace, name) and requests `n_tokens` tokens, waiting at
    /// most `max_wait_override` (or the service default if `None`).
    ///
    /// - `n_tokens` of `None` substitutes 1.
    /// - No bucket resolved -> `NoSuchBucket`.
    /// - `Take` returns a negative wait -> `TimedOutWaiting`.
    pub async fn allow(
        &self,
        namespace: &str,
        name: &str,
        n_tokens: Option<i64>,
        max_wait_override: Option<Duration>,
    ) -> Result<AllowResult, QuotaError> {
        let n_tokens = n_tokens.unwrap_or(1);
        let max_wait = max_wait_override.unwrap_or(self.default_max_wait);

        let bucket = self
            .container
            .find(namespace, name)
            .ok_or(QuotaError::NoSuchBucket)?;

        let wait = bucket.take(n_tokens, max_wait).await;
        if !wait.is_granted() {
            return Err(QuotaError::TimedOutWaiting);
        }

        Ok(AllowResult {
            granted_tokens: n_tokens,
            wait: nanos_to_duration(wait),
        })
    }
}

fn nanos_to_duration(wait: Wait) -> Duration {
    Duration::from_nanos(wait.0.max(0) as u64)
}
