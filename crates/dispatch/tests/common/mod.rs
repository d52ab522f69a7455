//! Test doubles for the dispatcher ports.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dispatch::{
    ClientDefaults, CredentialProvider, Dispatcher, RawResponse, Sleeper, Transport,
    TransportError, TransportRequest,
};

/// Replays a scripted sequence of outcomes and records every request sent.
///
/// Once the script runs out, the last entry repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    sent: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn always_refused() -> Arc<Self> {
        Self::new(vec![Err(TransportError::Connect("connection refused".into()))])
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &TransportRequest) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Unavailable("empty script".into())))
        }
    }
}

/// Credential source returning a fixed (or absent) token.
pub struct FixedToken(pub Option<String>);

impl CredentialProvider for FixedToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Virtual clock: sleeping returns immediately and advances virtual time.
#[derive(Default)]
pub struct VirtualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

#[async_trait]
impl Sleeper for VirtualClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn json(status: u16, status_text: &str, body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status,
        status_text: status_text.to_string(),
        content_type: Some("application/json".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

pub fn text(status: u16, status_text: &str, body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status,
        status_text: status_text.to_string(),
        content_type: Some("text/plain; charset=utf-8".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

pub fn dispatcher(
    transport: &Arc<ScriptedTransport>,
    token: Option<&str>,
    clock: &Arc<VirtualClock>,
) -> Dispatcher {
    Dispatcher::new(
        ClientDefaults::with_base_url("http://api.test/api/v1"),
        Arc::clone(transport),
        FixedToken(token.map(str::to_string)),
        Arc::clone(clock),
    )
}
