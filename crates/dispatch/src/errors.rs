//! Error and retry-policy types for the dispatch domain.
//!
//! [`TransportError`] is what a [`crate::Transport`] reports when an exchange
//! did not complete. [`DispatchError`] covers everything else that can stop a
//! call. Neither escapes [`crate::Dispatcher`]: both are rendered into
//! [`crate::ApiResult::Failure`] at the boundary.
//!
//! [`RetryPolicy`] is the cross-cutting piece: any error that participates in
//! retry decisions must be able to produce one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry.
///
/// - `Retryable`: the exchange never completed (connect failure, timeout,
///   abort). Another attempt may succeed.
/// - `NonRetryable`: the server answered, or the call was malformed before it
///   reached the network. Repeating it cannot change the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried after the caller's own back-off schedule.
    Retryable,
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

// ---------------------------------------------------------------------------
// Transport-level errors
// ---------------------------------------------------------------------------

/// Failure of a single attempt below the HTTP layer.
///
/// Produced by [`crate::Transport`] implementations. An HTTP error status is
/// *not* a transport error; the transport returns it as a normal
/// [`crate::RawResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The attempt did not complete within its deadline and was abandoned.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// No connection could be established (DNS failure, refused, unreachable).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The exchange was cut off before a status line arrived.
    #[error("request aborted: {0}")]
    Aborted(String),

    /// The status line arrived but the body could not be read.
    ///
    /// The exchange counts as completed, so this is never retried.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The transport could not be constructed or could not encode the request.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Returns the retry policy for this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Timeout(_) | Self::Connect(_) | Self::Aborted(_) => RetryPolicy::Retryable,
            Self::Body(_) | Self::Unavailable(_) => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch-level errors
// ---------------------------------------------------------------------------

/// Conditions that end a dispatch call without a normalized server payload.
///
/// The `Display` text of each variant is the `error` string callers see in
/// [`crate::ApiResult::Failure`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A generic dispatch path was handed a method it does not support.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// `base + path` (plus query) did not form a valid URL.
    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL text that failed to parse.
        url: String,
        /// Parser description of the problem.
        reason: String,
    },

    /// The request body could not be serialised to JSON.
    #[error("Failed to encode request body: {0}")]
    BodyEncoding(#[source] serde_json::Error),

    /// Every allowed attempt failed at the transport level.
    #[error("Request failed after {attempts} attempts: {source}")]
    AttemptsExhausted {
        /// Total attempts made (`retries + 1`).
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: TransportError,
    },

    /// A transport error that must not be retried ended the call early.
    #[error(transparent)]
    Transport(TransportError),

    /// The response declared a structured payload that failed to parse.
    #[error("{0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// The payload parsed but did not have the shape the caller asked for.
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(#[source] serde_json::Error),

    /// The retry loop ended without a terminal outcome.
    #[error("Maximum retry attempts exceeded")]
    RetriesExceeded,
}

impl DispatchError {
    /// Returns the retry policy for this error.
    ///
    /// Only transport-level failures are ever retryable; every other variant
    /// is decided before the network is touched or after the server answered.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport(e) => e.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}
