//! Request descriptor, per-call configuration, and process-wide defaults.
//!
//! A call's effective settings are [`RequestConfig`] layered over
//! [`ClientDefaults`]: headers merge with the per-call value winning, scalar
//! settings take the per-call value when present. Nothing here is retained
//! past the call that built it.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::DispatchError;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Per-attempt deadline used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Additional attempts after the first, used when none is configured.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Linear back-off step used when none is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// HTTP method of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the canonical upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` if a body supplied for this method is sent on the wire.
    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl FromStr for HttpMethod {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(DispatchError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Ordered header map with case-insensitive names.
///
/// Inserting a name that already exists (in any case) replaces the earlier
/// entry in place, keeping the spelling of the newer one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSet(Vec<(String, String)>);

impl HeaderSet {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.0.push((name, value)),
        }
    }

    /// Returns the value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Overlays every header in `other` onto `self`.
    pub fn merge(&mut self, other: &HeaderSet) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Per-call configuration
// ---------------------------------------------------------------------------

/// Optional per-call settings. Absent fields fall back to [`ClientDefaults`].
///
/// Query parameters are kept in insertion order. A parameter whose value is
/// `None` is dropped when the URL is built; it is never serialised as a
/// placeholder string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub headers: HeaderSet,
    pub params: Vec<(String, Option<String>)>,
    pub timeout: Option<Duration>,
    pub retries: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header, replacing any earlier header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), Some(value.to_string())));
        self
    }

    /// Adds a query parameter that is omitted from the URL when `None`.
    pub fn param_opt<V: ToString>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.params
            .push((name.into(), value.map(|v| v.to_string())));
        self
    }

    /// Adds a query parameter from a JSON value.
    ///
    /// `null` is omitted, strings are used verbatim, arrays are joined with
    /// `,`, and every other value uses its JSON text.
    pub fn param_value(mut self, name: impl Into<String>, value: &serde_json::Value) -> Self {
        self.params.push((name.into(), query_text(value)));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the number of attempts *after* the first. `0` means exactly one attempt.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }
}

fn query_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| query_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Process-wide defaults
// ---------------------------------------------------------------------------

/// Settings fixed when a [`crate::Dispatcher`] is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDefaults {
    /// API root; request paths are appended to it verbatim.
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub headers: HeaderSet,
}

impl ClientDefaults {
    /// Defaults pointing at `base_url`, everything else at the stock values.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            headers: [("Content-Type", "application/json")].into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Fully resolved settings for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderSet,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl ClientDefaults {
    /// Layers `config` over these defaults and builds the request.
    ///
    /// A present `token` always sets `Authorization: Bearer <token>`, replacing
    /// any caller-supplied `Authorization` header.
    pub fn resolve(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
        config: &RequestConfig,
        token: Option<&str>,
    ) -> Result<ResolvedRequest, DispatchError> {
        let url = build_url(&self.base_url, path, &config.params)?;

        let mut headers = self.headers.clone();
        headers.merge(&config.headers);
        if let Some(token) = token {
            headers.insert("Authorization", format!("Bearer {token}"));
        }

        let body = match body {
            Some(value) if method.carries_body() && !value.is_null() => {
                Some(serde_json::to_vec(value).map_err(DispatchError::BodyEncoding)?)
            }
            _ => None,
        };

        Ok(ResolvedRequest {
            method,
            url,
            headers,
            body,
            timeout: config.timeout.unwrap_or(self.timeout),
            retries: config.retries.unwrap_or(self.max_retries),
            retry_delay: config.retry_delay.unwrap_or(self.retry_delay),
        })
    }
}

/// Builds `base + path` and appends every parameter that has a value.
pub fn build_url(
    base_url: &str,
    path: &str,
    params: &[(String, Option<String>)],
) -> Result<Url, DispatchError> {
    let joined = format!("{base_url}{path}");
    let mut url = Url::parse(&joined).map_err(|e| DispatchError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })?;

    let present: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
        .collect();
    if !present.is_empty() {
        url.query_pairs_mut().extend_pairs(present);
    }

    Ok(url)
}
