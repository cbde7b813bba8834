//! Typed API client
//!
//! Wraps a [`Transport`] with envelope decoding and the bearer-token rule
//! from the endpoint catalogue.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::endpoints::Endpoint;
use crate::error::{AppError, Result};
use crate::http::{ApiRequest, HttpError, Method, Transport};

/// Client for the remote API
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Issue one call and return the raw JSON body
    ///
    /// Authenticated endpoints fail with [`AppError::Unauthorized`] without
    /// touching the network when `token` is `None`.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        query: &[(&str, &str)],
        body: Option<Value>,
        token: Option<String>,
    ) -> Result<Value> {
        if endpoint.requires_auth() && token.is_none() {
            tracing::debug!(path = %endpoint.path, "No session for authenticated endpoint");
            return Err(AppError::Unauthorized);
        }

        let mut request = match endpoint.method {
            Method::Get => ApiRequest::get(endpoint.path.clone()),
            Method::Post => ApiRequest::post(endpoint.path.clone(), body.unwrap_or(Value::Null)),
        };
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        if endpoint.requires_auth() {
            request = request.bearer(token);
        }

        Ok(self.transport.send(request).await?)
    }

    /// GET an endpoint and decode its envelope
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        query: &[(&str, &str)],
        token: Option<String>,
    ) -> Result<T> {
        let body = self.call(endpoint, query, None, token).await?;
        Ok(decode(body, endpoint.envelope)?)
    }

    /// POST `body` and decode the envelope of the response
    pub async fn submit<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: Value,
        token: Option<String>,
    ) -> Result<T> {
        let response = self.call(endpoint, &[], Some(body), token).await?;
        Ok(decode(response, endpoint.envelope)?)
    }

    /// POST `body`, accepting a response that carries no record
    ///
    /// Returns `None` when the envelope key is absent or null.
    pub async fn submit_optional<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: Value,
        token: Option<String>,
    ) -> Result<Option<T>> {
        let response = self.call(endpoint, &[], Some(body), token).await?;
        let payload = match endpoint.envelope {
            Some(key) => response.get(key).cloned().unwrap_or(Value::Null),
            None => response,
        };
        if payload.is_null() {
            return Ok(None);
        }
        Ok(Some(from_payload(payload)?))
    }
}

/// Unwrap `envelope` from `body` and deserialize it
///
/// A missing key or a payload of the wrong shape is a parse error.
pub fn decode<T: DeserializeOwned>(
    body: Value,
    envelope: Option<&str>,
) -> std::result::Result<T, HttpError> {
    let payload = match envelope {
        Some(key) => match body {
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| HttpError::parse(format!("response has no `{}` field", key)))?,
            other => {
                return Err(HttpError::parse(format!(
                    "expected an object with `{}`, got {}",
                    key,
                    kind_of(&other)
                )));
            }
        },
        None => body,
    };
    from_payload(payload)
}

fn from_payload<T: DeserializeOwned>(payload: Value) -> std::result::Result<T, HttpError> {
    serde_json::from_value(payload).map_err(|e| HttpError::parse(e.to_string()))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
