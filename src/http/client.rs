//! reqwest-backed transport

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::Value;

use super::{ApiRequest, HttpError, Method, Transport, failure_message};
use crate::config::ApiConfig;
use crate::error::AppError;

/// Transport that talks to the remote API over HTTP
///
/// Holds one pooled `reqwest::Client`; the timeout configured here is the
/// only timeout applied to requests.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: url::Url,
}

impl ReqwestTransport {
    /// Create a transport from API configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if the base URL is invalid and
    /// `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let base_url = config.parsed_base_url()?;
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Resolve an API route against the base URL
    ///
    /// The base URL may carry a path prefix (e.g. `/api`), so the route is
    /// appended rather than joined.
    fn endpoint_url(&self, path: &str) -> Result<url::Url, HttpError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let route = path.trim_start_matches('/');
        url::Url::parse(&format!("{}/{}", base, route))
            .map_err(|e| HttpError::network(format!("invalid request URL for {}: {}", path, e)))
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, HttpError> {
        let url = self.endpoint_url(&request.path)?;

        let mut builder = match request.method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url),
        };
        builder = builder.header("Accept", "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.token.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(HttpError::server(
                status.as_u16(),
                failure_message(&body, status.as_u16()),
            ));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            HttpError::parse(format!("malformed JSON from {}: {}", request.path, e))
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, HttpError>> {
        Box::pin(async move {
            let method = request.method;
            let path = request.path.clone();
            let started = Instant::now();

            let result = self.execute(request).await;

            let outcome = match &result {
                Ok(_) => "ok".to_string(),
                Err(err) => err
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("{:?}", err.kind).to_lowercase()),
            };
            crate::metrics::record_api_request(method.as_str(), &outcome, started.elapsed());

            match &result {
                Ok(_) => tracing::debug!(%method, %path, "API request succeeded"),
                Err(error) => tracing::debug!(%method, %path, %error, "API request failed"),
            }

            result
        })
    }
}

fn classify_transport_error(error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::timeout()
    } else if error.is_decode() {
        HttpError::parse(error.to_string())
    } else {
        HttpError::network(error.to_string())
    }
}
