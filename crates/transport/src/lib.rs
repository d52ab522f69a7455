//! Courier infrastructure adapters.
//!
//! Implements the port traits defined in the [`dispatch`] crate:
//!
//! - [`ReqwestTransport`]: [`dispatch::Transport`] over a pooled reqwest
//!   client with per-attempt deadlines.
//! - [`TokioSleeper`]: [`dispatch::Sleeper`] on the tokio timer.
//! - [`EnvCredentials`], [`StoredToken`], [`StaticToken`], [`NoCredentials`]:
//!   [`dispatch::CredentialProvider`] sources for the bearer token.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Sockets, TLS, timers, and credential storage live here.
//! The [`dispatch`] crate sees only its own traits.

pub mod credentials;
pub mod http;
pub mod sleep;

pub use credentials::{
    EnvCredentials, KeyedFileStore, NoCredentials, StaticToken, StoredToken, ACCESS_TOKEN_KEY,
    DEFAULT_TOKEN_ENV,
};
pub use http::ReqwestTransport;
pub use sleep::TokioSleeper;

use dispatch::{ClientDefaults, CredentialProvider, Dispatcher, TransportError};

/// Builds a [`Dispatcher`] on the real network stack.
pub fn connect(
    defaults: ClientDefaults,
    credentials: impl CredentialProvider + 'static,
) -> Result<Dispatcher, TransportError> {
    let transport = ReqwestTransport::new()?;
    Ok(Dispatcher::new(defaults, transport, credentials, TokioSleeper))
}
