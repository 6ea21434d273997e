//! Error kinds for quota operations (see `QuotaService` facade).

/// Error surfaced by the `QuotaService` facade and mapped 1:1 to an RPC
/// status by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// `Find` returned no bucket for the requested (namespace, name).
    #[error("no such bucket")]
    NoSuchBucket,

    /// The back-end signalled the request cannot be satisfied by policy.
    #[error("rejected: {reason}")]
    Rejected {
        /// Human-readable reason supplied by the back-end.
        reason: String,
    },

    /// `Take` returned a negative wait: not granted within the caller's
    /// patience.
    #[error("timed out waiting for tokens")]
    TimedOutWaiting,

    /// Validation failure or an unclassified back-end error.
    #[error("{0}")]
    Failed(String),
}
