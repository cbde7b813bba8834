//! HTTP client adapter
//!
//! One request in, one parsed JSON body (or a classified [`HttpError`]) out.
//! No retries and no caching happen at this layer.

mod client;

use std::fmt;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

pub use client::ReqwestTransport;

/// HTTP method used by the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single call against the remote API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Route relative to the configured base URL (e.g. `/posts`)
    pub path: String,
    /// Query string pairs, appended in order
    pub query: Vec<(String, String)>,
    /// JSON payload for POST requests
    pub body: Option<Value>,
    /// Bearer credential, read from the auth context at call time
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            token: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            token: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// Classification of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// Transport failure before a response was received
    Network,
    /// Transport timeout
    Timeout,
    /// Non-2xx response
    ServerError,
    /// Body was not valid JSON
    ParseError,
}

/// Adapter-level error
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct HttpError {
    /// HTTP status code, if a response was received
    pub status: Option<u16>,
    pub kind: HttpErrorKind,
    /// Human-readable message (server-provided for `ServerError`)
    pub message: String,
}

impl HttpError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            kind: HttpErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            status: None,
            kind: HttpErrorKind::Timeout,
            message: "request timed out".to_string(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            kind: HttpErrorKind::ServerError,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            status: None,
            kind: HttpErrorKind::ParseError,
            message: message.into(),
        }
    }
}

/// Issues requests against the remote API
///
/// Implementations perform exactly one network call per invocation.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, HttpError>>;
}

/// Extract the server-provided message from a failure body
///
/// Failure bodies look like `{ "message": "..." }`; anything else falls
/// back to the canonical reason phrase.
pub(crate) fn failure_message(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Request failed")
                .to_string()
        })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_prefers_server_message() {
        assert_eq!(
            failure_message(r#"{"message":"Invalid credentials"}"#, 400),
            "Invalid credentials"
        );
    }

    #[test]
    fn failure_message_falls_back_to_reason_phrase() {
        assert_eq!(failure_message("<html>oops</html>", 502), "Bad Gateway");
        assert_eq!(failure_message(r#"{"message":"  "}"#, 404), "Not Found");
    }

    #[test]
    fn request_builder_collects_query_and_token() {
        let request = ApiRequest::get("/search")
            .query("q", "john")
            .bearer(Some("t0k".to_string()));
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query, vec![("q".to_string(), "john".to_string())]);
        assert_eq!(request.token.as_deref(), Some("t0k"));
    }
}
