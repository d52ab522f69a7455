//! The resilient request dispatcher.
//!
//! Executes one logical request: resolves settings, injects the bearer token,
//! drives the [`RetrySchedule`] state machine through the [`Transport`] and
//! [`Sleeper`] ports, and folds whatever happened into an [`ApiResult`].
//!
//! No entry point returns `Err` or panics on a failed call. Transport errors,
//! HTTP error statuses, malformed payloads, and misuse (bad method, bad URL,
//! unencodable body) all come back as [`ApiResult::Failure`].

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::DispatchError;
use crate::ports::{CredentialProvider, Sleeper, Transport, TransportRequest};
use crate::request::{ClientDefaults, HttpMethod, RequestConfig};
use crate::response::{normalize, ApiResult};
use crate::retry::{AttemptOutcome, RetrySchedule, RetryState, Terminal};

/// Issues requests against one API root.
///
/// Cheap to clone; clones share the same transport, credential source, and
/// sleeper. Independent calls may run concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    defaults: Arc<ClientDefaults>,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    sleeper: Arc<dyn Sleeper>,
}

impl Dispatcher {
    pub fn new(
        defaults: ClientDefaults,
        transport: impl Transport + 'static,
        credentials: impl CredentialProvider + 'static,
        sleeper: impl Sleeper + 'static,
    ) -> Self {
        tracing::info!(
            base_url = %defaults.base_url,
            timeout_ms = defaults.timeout.as_millis() as u64,
            max_retries = defaults.max_retries,
            "Dispatcher initialized"
        );
        Self {
            defaults: Arc::new(defaults),
            transport: Arc::new(transport),
            credentials: Arc::new(credentials),
            sleeper: Arc::new(sleeper),
        }
    }

    pub fn defaults(&self) -> &ClientDefaults {
        &self.defaults
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        config: Option<&RequestConfig>,
    ) -> ApiResult<T> {
        self.send(HttpMethod::Get, path, None, config).await.decode()
    }

    pub async fn post<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(HttpMethod::Post, path, body, config)
            .await
            .decode()
    }

    pub async fn put<B, T>(
        &self,
        path: &str,
        body: Option<&B>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(HttpMethod::Put, path, body, config)
            .await
            .decode()
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        config: Option<&RequestConfig>,
    ) -> ApiResult<T> {
        self.send(HttpMethod::Delete, path, None, config)
            .await
            .decode()
    }

    /// Generic dispatch by method name.
    ///
    /// An unsupported method fails immediately without touching the network.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<Value> {
        match method.parse::<HttpMethod>() {
            Ok(method) => self.send(method, path, body, config).await,
            Err(e) => {
                tracing::warn!(method, path, error = %e, "Request rejected");
                e.into()
            }
        }
    }

    /// `GET /health`.
    pub async fn health(&self) -> ApiResult<Value> {
        self.send(HttpMethod::Get, "/health", None, None).await
    }

    async fn send_with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<Value> {
        let body = match body.map(serde_json::to_value).transpose() {
            Ok(body) => body,
            Err(e) => return DispatchError::BodyEncoding(e).into(),
        };
        self.send(method, path, body, config).await
    }

    /// Core dispatch path; every entry point funnels through here.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<Value> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("dispatch", %request_id, %method, path);
        self.execute(method, path, body, config)
            .instrument(span)
            .await
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        config: Option<&RequestConfig>,
    ) -> ApiResult<Value> {
        let config = config.cloned().unwrap_or_default();

        let token = self
            .credentials
            .bearer_token()
            .filter(|t| !t.trim().is_empty());
        tracing::debug!(authenticated = token.is_some(), "Credentials resolved");

        let resolved =
            match self
                .defaults
                .resolve(method, path, body.as_ref(), &config, token.as_deref())
            {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(error = %e, "Request rejected before dispatch");
                    return e.into();
                }
            };

        let schedule = RetrySchedule::new(resolved.retries, resolved.retry_delay);
        let request = TransportRequest {
            method,
            url: resolved.url,
            headers: resolved.headers,
            body: resolved.body,
            timeout: resolved.timeout,
        };
        tracing::debug!(url = %request.url, "Request URL resolved");

        match self.drive(&schedule, &request).await {
            Terminal::Completed(response) => {
                let result = normalize(&response);
                match &result {
                    ApiResult::Success { .. } => {
                        tracing::info!(status = response.status, "Request succeeded");
                    }
                    ApiResult::Failure { error } => {
                        tracing::warn!(status = response.status, error = %error, "Request failed");
                    }
                }
                result
            }
            Terminal::Failed(e) => {
                tracing::error!(error = %e, "Request failed");
                e.into()
            }
        }
    }

    /// Runs the retry state machine to a terminal state.
    ///
    /// Attempts are strictly sequential; each one waits for the previous
    /// attempt and any back-off to finish.
    async fn drive(&self, schedule: &RetrySchedule, request: &TransportRequest) -> Terminal {
        let max_attempts = schedule.max_attempts();
        let mut state = schedule.start();
        loop {
            state = match state {
                RetryState::Attempting { attempt } if attempt >= max_attempts => {
                    RetryState::Done(Terminal::Failed(DispatchError::RetriesExceeded))
                }
                RetryState::Attempting { attempt } => {
                    tracing::debug!(attempt = attempt + 1, max_attempts, "Sending request");
                    let started = Instant::now();
                    let outcome = match self.transport.send(request).await {
                        Ok(response) => {
                            tracing::debug!(
                                attempt = attempt + 1,
                                status = response.status,
                                latency_ms = started.elapsed().as_millis() as u64,
                                "Request completed"
                            );
                            AttemptOutcome::Completed(response)
                        }
                        Err(e) => {
                            tracing::warn!(
                                attempt = attempt + 1,
                                max_attempts,
                                latency_ms = started.elapsed().as_millis() as u64,
                                error = %e,
                                "Attempt failed"
                            );
                            AttemptOutcome::Failed(e)
                        }
                    };
                    schedule.advance(attempt, outcome)
                }
                RetryState::Backoff {
                    next_attempt,
                    delay,
                } => {
                    tracing::debug!(
                        delay_ms = delay.as_millis() as u64,
                        next_attempt = next_attempt + 1,
                        "Retrying after back-off"
                    );
                    self.sleeper.sleep(delay).await;
                    RetryState::Attempting {
                        attempt: next_attempt,
                    }
                }
                RetryState::Done(terminal) => return terminal,
            };
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.defaults.base_url)
            .field("timeout", &self.defaults.timeout)
            .field("max_retries", &self.defaults.max_retries)
            .finish()
    }
}
