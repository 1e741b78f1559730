//! Structured errors for backend calls.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorKind {
    /// Non-success HTTP status other than 401
    HttpStatus,
    /// 401 or an envelope code of 401; the stored token is missing or stale
    Unauthorized,
    /// Request timed out
    Timeout,
    /// Could not reach the backend
    Connect,
    /// The event stream broke after it was opened
    Stream,
    /// Response body was not what we expected
    Parse,
    /// Envelope carried a non-200 `code`
    Api,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::HttpStatus => write!(f, "http_status"),
            ClientErrorKind::Unauthorized => write!(f, "unauthorized"),
            ClientErrorKind::Timeout => write!(f, "timeout"),
            ClientErrorKind::Connect => write!(f, "connect"),
            ClientErrorKind::Stream => write!(f, "stream"),
            ClientErrorKind::Parse => write!(f, "parse"),
            ClientErrorKind::Api => write!(f, "api"),
        }
    }
}

/// Error from the REST client or the stream transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional raw body or underlying error text
    pub details: Option<String>,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Builds an error from a non-success HTTP response.
    ///
    /// The backend wraps failures in `{code, msg, data}`; when the body has
    /// that shape the `msg` becomes part of the summary.
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = if status == 401 {
            ClientErrorKind::Unauthorized
        } else {
            ClientErrorKind::HttpStatus
        };

        let summary = envelope_message(body)
            .map_or_else(|| format!("HTTP {status}"), |msg| format!("HTTP {status}: {msg}"));

        let err = Self::new(kind, summary);
        if body.is_empty() {
            err
        } else {
            err.with_details(body)
        }
    }

    /// Builds an error from an envelope whose `code` is not 200.
    pub fn api(code: i64, message: Option<&str>) -> Self {
        let kind = if code == 401 {
            ClientErrorKind::Unauthorized
        } else {
            ClientErrorKind::Api
        };
        let message = match message {
            Some(msg) if !msg.is_empty() => format!("{msg} (code {code})"),
            _ => format!("request failed (code {code})"),
        };
        Self::new(kind, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Parse, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ClientErrorKind::Unauthorized
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ClientError {}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Maps a reqwest failure onto a client error kind.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::new(ClientErrorKind::Timeout, format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ClientError::new(ClientErrorKind::Connect, format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ClientError::parse(format!("Invalid response body: {e}"))
    } else {
        ClientError::new(ClientErrorKind::Connect, format!("Network error: {e}"))
    }
}

fn envelope_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    ["msg", "message"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
        })
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_envelope_msg() {
        let err = ClientError::http_status(400, r#"{"code":400,"msg":"bad params","data":null}"#);
        assert_eq!(err.kind, ClientErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 400: bad params");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_401_is_unauthorized() {
        let err = ClientError::http_status(401, "");
        assert!(err.is_unauthorized());
        assert_eq!(err.message, "HTTP 401");
        assert_eq!(err.details, None);
    }

    #[test]
    fn test_http_status_plain_body() {
        let err = ClientError::http_status(502, "upstream down");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("upstream down"));
    }

    #[test]
    fn test_api_error_message() {
        assert_eq!(
            ClientError::api(400, Some("no such conversation")).to_string(),
            "no such conversation (code 400)"
        );
        assert_eq!(ClientError::api(500, None).to_string(), "request failed (code 500)");
        assert!(ClientError::api(401, Some("expired")).is_unauthorized());
    }
}
