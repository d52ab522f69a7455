//! Resilient request dispatch for Courier.
//!
//! This crate owns how a single logical request against the backend API is
//! issued, retried, bounded in time, and translated into one uniform result.
//! Callers (search, directory, chat, summary clients) never touch network
//! primitives; they call a [`Dispatcher`] and branch on the [`ApiResult`].
//!
//! ## Architectural Layer
//!
//! **Domain logic + port definitions.** This crate has no network or runtime
//! dependencies. It defines *what* is needed through [`Transport`],
//! [`CredentialProvider`], and [`Sleeper`]; the `transport` crate defines *how*
//! to supply them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`request`] | Methods, headers, per-call config, defaults, URL building |
//! | [`response`] | [`ApiResult`], raw exchanges, payload normalization |
//! | [`retry`] | Linear back-off state machine |
//! | [`ports`] | Transport, credential, and sleep traits |
//! | [`dispatcher`] | [`Dispatcher`], the entry points |
//! | [`errors`] | Error and retry-policy types |

pub mod dispatcher;
pub mod errors;
pub mod ports;
pub mod request;
pub mod response;
pub mod retry;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use dispatcher::Dispatcher;
pub use errors::{DispatchError, RetryPolicy, TransportError};
pub use ports::{CredentialProvider, Sleeper, Transport, TransportRequest};
pub use request::{
    build_url, ClientDefaults, HeaderSet, HttpMethod, RequestConfig, ResolvedRequest,
    DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use response::{normalize, ApiResult, Envelope, RawResponse, ServerPayload};
pub use retry::{AttemptOutcome, RetrySchedule, RetryState, Terminal};
