//! reqwest-backed [`Transport`].

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use dispatch::{HttpMethod, RawResponse, Transport, TransportError, TransportRequest};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

/// Sends each attempt over a shared, pooled [`reqwest::Client`].
///
/// The per-attempt deadline from [`TransportRequest::timeout`] covers the
/// whole exchange, body included.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport with a fresh connection pool.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Unavailable(describe(&e)))?;
        Ok(Self { client })
    }

    /// Wraps an existing client (e.g. one with custom TLS roots or proxies).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(to_reqwest(request.method), request.url.clone())
            .timeout(request.timeout);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&e, request.timeout))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // The status line has arrived; anything that goes wrong from here on
        // happened inside a completed exchange.
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Body(format!(
                    "timed out after {}ms",
                    request.timeout.as_millis()
                ))
            } else {
                TransportError::Body(describe(&e))
            }
        })?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body: body.to_vec(),
        })
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_builder() {
        TransportError::Unavailable(describe(error))
    } else if error.is_connect() {
        TransportError::Connect(describe(error))
    } else {
        TransportError::Aborted(describe(error))
    }
}

/// Flattens an error and its source chain into one line.
fn describe(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_map_one_to_one() {
        assert_eq!(to_reqwest(HttpMethod::Get), Method::GET);
        assert_eq!(to_reqwest(HttpMethod::Post), Method::POST);
        assert_eq!(to_reqwest(HttpMethod::Put), Method::PUT);
        assert_eq!(to_reqwest(HttpMethod::Delete), Method::DELETE);
    }
}
