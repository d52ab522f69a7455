//! Normalized call results and server payload decoding.
//!
//! Servers answer with a mix of shapes: an envelope
//! (`{"success": true, "data": ..., "message": ...}`), a bare JSON document, or
//! plain text. [`normalize`] folds all of them, plus HTTP error statuses, into
//! one [`ApiResult`].

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::errors::DispatchError;

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of one logical request. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success {
        data: T,
        /// Informational message supplied by the server, if any.
        message: Option<String>,
    },
    Failure {
        error: String,
    },
}

impl<T> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self::Success {
            data,
            message: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the payload of a success, `None` on failure.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => message.as_deref(),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the error text of a failure, `None` on success.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Converts into a standard `Result`, discarding any success message.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success { data, .. } => Ok(data),
            Self::Failure { error } => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            Self::Success { data, message } => ApiResult::Success {
                data: f(data),
                message,
            },
            Self::Failure { error } => ApiResult::Failure { error },
        }
    }
}

impl ApiResult<Value> {
    /// Decodes a success payload into `T`.
    ///
    /// A payload that does not match `T` becomes a failure rather than being
    /// passed through.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            Self::Success { data, message } => match serde_json::from_value(data) {
                Ok(data) => ApiResult::Success { data, message },
                Err(e) => ApiResult::failure(DispatchError::UnexpectedShape(e).to_string()),
            },
            Self::Failure { error } => ApiResult::Failure { error },
        }
    }
}

impl<T> From<DispatchError> for ApiResult<T> {
    fn from(err: DispatchError) -> Self {
        Self::failure(err.to_string())
    }
}

/// Serialises to the wire envelope `{success, data, message?, error?}`.
impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success { data, message } => {
                let len = if message.is_some() { 3 } else { 2 };
                let mut s = serializer.serialize_struct("ApiResult", len)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("data", data)?;
                if let Some(message) = message {
                    s.serialize_field("message", message)?;
                }
                s.end()
            }
            Self::Failure { error } => {
                let mut s = serializer.serialize_struct("ApiResult", 3)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("data", &Value::Null)?;
                s.serialize_field("error", error)?;
                s.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Raw exchange
// ---------------------------------------------------------------------------

/// A completed HTTP exchange as delivered by a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Reason phrase, e.g. `"Not Found"`. May be empty.
    pub status_text: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Returns `true` for a 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` if the content type declares a JSON payload.
    pub fn is_structured(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            let essence = ct.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("application/json")
                || essence.to_ascii_lowercase().ends_with("+json")
        })
    }

    fn status_line(&self) -> String {
        format!("HTTP {}: {}", self.status, self.status_text)
    }
}

// ---------------------------------------------------------------------------
// Server payloads
// ---------------------------------------------------------------------------

/// Fields a server envelope may carry. Unknown fields are kept in `Value`
/// form by [`ServerPayload`] so the raw document can still be returned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default, deserialize_with = "flag_field")]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "text_field")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub error: Option<String>,
}

/// Decoded JSON body.
#[derive(Debug, Clone)]
pub enum ServerPayload {
    /// A JSON object, with its envelope fields picked out.
    Envelope { fields: Envelope, raw: Value },
    /// Any other JSON document (array, string, number, ...).
    Bare(Value),
}

impl ServerPayload {
    pub fn parse(body: &[u8]) -> Result<Self, DispatchError> {
        let raw: Value = serde_json::from_slice(body).map_err(DispatchError::MalformedPayload)?;
        if !raw.is_object() {
            return Ok(Self::Bare(raw));
        }
        let fields = Envelope::deserialize(&raw).map_err(DispatchError::MalformedPayload)?;
        Ok(Self::Envelope { fields, raw })
    }
}

/// Accepts a boolean, treats anything else as absent.
fn flag_field<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_bool()))
}

/// Accepts a string, treats `null`, empty strings, and non-string values as absent.
fn text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Folds a completed exchange into an [`ApiResult`].
///
/// - JSON, non-2xx: failure with `message`, else `error`, else the status line.
/// - JSON, 2xx, `success: false`: failure, same message precedence.
/// - JSON, 2xx: success with `data` when present and non-null, else the whole document.
/// - Text, non-2xx: failure with the status line.
/// - Text, 2xx: success with the body as a JSON string.
/// - Unparseable JSON: failure with the parser's description.
pub fn normalize(response: &RawResponse) -> ApiResult<Value> {
    if !response.is_structured() {
        if !response.is_ok() {
            return ApiResult::failure(response.status_line());
        }
        let text = String::from_utf8_lossy(&response.body).into_owned();
        return ApiResult::success(Value::String(text));
    }

    let payload = match ServerPayload::parse(&response.body) {
        Ok(payload) => payload,
        Err(e) => return e.into(),
    };

    match payload {
        ServerPayload::Bare(raw) => {
            if response.is_ok() {
                ApiResult::success(raw)
            } else {
                ApiResult::failure(response.status_line())
            }
        }
        ServerPayload::Envelope { fields, raw } => {
            let reported_failure = fields.success == Some(false);
            if !response.is_ok() || reported_failure {
                let error = fields
                    .message
                    .or(fields.error)
                    .unwrap_or_else(|| response.status_line());
                return ApiResult::failure(error);
            }
            let data = match fields.data {
                Some(data) if !data.is_null() => data,
                _ => raw,
            };
            ApiResult::Success {
                data,
                message: fields.message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_response(status: u16, status_text: &str, body: &str) -> RawResponse {
        RawResponse {
            status,
            status_text: status_text.to_string(),
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    fn text_response(status: u16, status_text: &str, body: &str) -> RawResponse {
        RawResponse {
            status,
            status_text: status_text.to_string(),
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn envelope_data_is_unwrapped() {
        let result = normalize(&json_response(
            200,
            "OK",
            r#"{"success": true, "data": {"x": 1}, "message": "found"}"#,
        ));
        assert_eq!(result.data(), Some(&json!({"x": 1})));
        assert_eq!(result.message(), Some("found"));
    }

    #[test]
    fn bare_object_falls_back_to_whole_payload() {
        let result = normalize(&json_response(200, "OK", r#"{"x": 1}"#));
        assert_eq!(
            result,
            ApiResult::Success {
                data: json!({"x": 1}),
                message: None
            }
        );
    }

    #[test]
    fn null_data_falls_back_to_whole_payload() {
        let result = normalize(&json_response(200, "OK", r#"{"data": null, "total": 0}"#));
        assert_eq!(result.data(), Some(&json!({"data": null, "total": 0})));
    }

    #[test]
    fn bare_array_is_success() {
        let result = normalize(&json_response(200, "OK", "[1,2,3]"));
        assert_eq!(result.data(), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn error_status_prefers_message_then_error_then_status_line() {
        let with_message = normalize(&json_response(
            400,
            "Bad Request",
            r#"{"message": "bad query", "error": "E1"}"#,
        ));
        assert_eq!(with_message.error(), Some("bad query"));

        let with_error = normalize(&json_response(400, "Bad Request", r#"{"error": "E1"}"#));
        assert_eq!(with_error.error(), Some("E1"));

        let neither = normalize(&json_response(
            500,
            "Internal Server Error",
            r#"{"detail": "boom"}"#,
        ));
        assert_eq!(neither.error(), Some("HTTP 500: Internal Server Error"));
    }

    #[test]
    fn empty_message_counts_as_absent() {
        let result = normalize(&json_response(404, "Not Found", r#"{"message": "", "error": "gone"}"#));
        assert_eq!(result.error(), Some("gone"));
    }

    #[test]
    fn success_false_envelope_is_failure_even_on_2xx() {
        let result = normalize(&json_response(
            200,
            "OK",
            r#"{"success": false, "data": {"x": 1}, "error": "quota exhausted"}"#,
        ));
        assert_eq!(result, ApiResult::failure("quota exhausted"));
    }

    #[test]
    fn text_body_is_success_data() {
        let result = normalize(&text_response(200, "OK", "pong"));
        assert_eq!(result.data(), Some(&json!("pong")));
    }

    #[test]
    fn text_error_uses_status_line() {
        let result = normalize(&text_response(502, "Bad Gateway", "<html>upstream</html>"));
        assert_eq!(result.error(), Some("HTTP 502: Bad Gateway"));
    }

    #[test]
    fn malformed_json_is_failure() {
        let result = normalize(&json_response(200, "OK", "{not json"));
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("key must be a string"));
    }

    #[test]
    fn vendor_json_content_type_is_structured() {
        let mut response = json_response(200, "OK", r#"{"x": 1}"#);
        response.content_type = Some("application/problem+json".into());
        assert!(response.is_structured());
        response.content_type = None;
        assert!(!response.is_structured());
    }

    #[test]
    fn decode_rejects_shape_mismatch() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Health {
            status: String,
        }

        let ok = ApiResult::success(json!({"status": "up"})).decode::<Health>();
        assert_eq!(ok.data(), Some(&Health { status: "up".into() }));

        let bad = ApiResult::success(json!([1])).decode::<Health>();
        assert!(bad.error().unwrap().starts_with("Unexpected response shape"));
    }

    #[test]
    fn serializes_to_wire_envelope() {
        let ok = serde_json::to_value(ApiResult::Success {
            data: json!({"x": 1}),
            message: Some("hi".into()),
        })
        .unwrap();
        assert_eq!(ok, json!({"success": true, "data": {"x": 1}, "message": "hi"}));

        let err = serde_json::to_value(ApiResult::<Value>::failure("nope")).unwrap();
        assert_eq!(err, json!({"success": false, "data": null, "error": "nope"}));
    }
}
