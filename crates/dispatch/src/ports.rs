//! Port traits the dispatcher depends on.
//!
//! Infrastructure crates implement these; the dispatcher never touches a
//! socket, a timer, or a credential store directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::errors::TransportError;
use crate::request::{HeaderSet, HttpMethod};
use crate::response::RawResponse;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One attempt's worth of request, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderSet,
    /// JSON-encoded body. `None` for methods that carry no body.
    pub body: Option<Vec<u8>>,
    /// Hard deadline for this attempt; the transport must abandon the
    /// exchange and return [`TransportError::Timeout`] once it passes.
    pub timeout: Duration,
}

/// Issues a single HTTP exchange.
///
/// Any response with a status line is `Ok`, including 4xx and 5xx. `Err` is
/// reserved for exchanges that did not complete.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request).await
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Read-only source of the bearer token.
///
/// Consulted once per call. `None` is not an error; the request simply goes
/// out without an `Authorization` header.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Scheduler-agnostic wait used between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}
