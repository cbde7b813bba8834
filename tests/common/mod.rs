//! Common test utilities for E2E tests
//!
//! `MockApi` is an in-process axum server standing in for the remote API.
//! Tests script replies per route and inspect what the client sent.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use rustroom::api::{Session, User};
use rustroom::{AppContext, config};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Prefix every mock route lives under, mirroring a real deployment
const API_PREFIX: &str = "/api";

/// Scripted response for one route
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: json!({ "message": message }).to_string(),
            delay: None,
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    gate: Arc<Mutex<Option<watch::Receiver<bool>>>>,
}

/// In-process mock of the remote API
pub struct MockApi {
    pub base_url: String,
    state: MockState,
}

impl MockApi {
    /// Bind to a random local port and start serving
    pub async fn start() -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            gate: Arc::new(Mutex::new(None)),
        };

        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}{}", addr, API_PREFIX),
            state,
        }
    }

    /// Queue `reply` for `method path`
    ///
    /// Replies are used in order; the last one repeats for later requests.
    pub fn on(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.state
            .replies
            .lock()
            .entry(route_key(method, path))
            .or_default()
            .push_back(reply);
        self
    }

    /// Hold every response until the returned gate is opened
    pub fn hold(&self) -> watch::Sender<bool> {
        let (tx, rx) = watch::channel(false);
        *self.state.gate.lock() = Some(rx);
        tx
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().clone()
    }

    /// Requests received for `method path`
    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// Client configuration pointing at this mock
    pub fn config(&self) -> config::AppConfig {
        let mut config = config::AppConfig::default();
        config.api.base_url = self.base_url.clone();
        config.api.timeout_seconds = 5;
        config
    }

    /// App context over the real reqwest transport
    pub fn app(&self) -> AppContext {
        AppContext::new(self.config()).unwrap()
    }

    /// App context with a session already established
    pub fn signed_in_app(&self) -> AppContext {
        let app = self.app();
        sign_in(&app);
        app
    }
}

pub const TEST_TOKEN: &str = "test-token";

pub fn sign_in(app: &AppContext) {
    app.auth.set_session(Session {
        token: TEST_TOKEN.to_string(),
        user: User {
            id: "me".into(),
            name: "Grace Hopper".to_string(),
            username: "grace".to_string(),
            email: Some("grace@example.com".to_string()),
            avatar_url: None,
        },
    });
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), path)
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_PREFIX)
        .unwrap_or(uri.path())
        .to_string();

    state.requests.lock().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let gate = state.gate.lock().clone();
    if let Some(mut gate) = gate {
        while !*gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }
    }

    let reply = {
        let mut replies = state.replies.lock();
        match replies.get_mut(&route_key(method.as_str(), &path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };
    let Some(reply) = reply else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/json")],
            json!({ "message": format!("No route for {} {}", method, path) }).to_string(),
        )
            .into_response();
    };

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}
