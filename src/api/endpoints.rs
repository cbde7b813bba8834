//! Endpoint catalogue
//!
//! Every route the client calls, with the JSON key its payload is wrapped
//! in and whether a bearer token must be attached.

use crate::http::Method;

use super::dto::EntityId;

/// Whether a route needs a signed-in session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authenticated,
    Anonymous,
}

/// Description of one remote route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    /// Top-level key holding the payload; `None` means the whole body
    pub envelope: Option<&'static str>,
    pub access: Access,
}

impl Endpoint {
    fn get(path: impl Into<String>, envelope: &'static str) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            envelope: Some(envelope),
            access: Access::Authenticated,
        }
    }

    fn post(path: impl Into<String>, envelope: Option<&'static str>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            envelope,
            access: Access::Authenticated,
        }
    }

    fn anonymous(mut self) -> Self {
        self.access = Access::Anonymous;
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.access == Access::Authenticated
    }

    // Auth

    pub fn login() -> Self {
        Self::post("/auth/login", None).anonymous()
    }

    pub fn register() -> Self {
        Self::post("/auth/register", None).anonymous()
    }

    // Feed

    pub fn posts() -> Self {
        Self::get("/posts", "posts")
    }

    pub fn create_post() -> Self {
        Self::post("/posts", Some("post"))
    }

    pub fn like_post(post_id: &EntityId) -> Self {
        Self::post(format!("/posts/{}/like", segment(post_id)), Some("post"))
    }

    pub fn unlike_post(post_id: &EntityId) -> Self {
        Self::post(format!("/posts/{}/unlike", segment(post_id)), Some("post"))
    }

    pub fn add_to_readlist() -> Self {
        Self::post("/readlist", Some("post"))
    }

    pub fn live_classes() -> Self {
        Self::get("/live-classes", "live_classes")
    }

    // Comments

    pub fn comments(post_id: &EntityId) -> Self {
        Self::get(format!("/posts/{}/comments", segment(post_id)), "comments")
    }

    pub fn create_comment(post_id: &EntityId) -> Self {
        Self::post(format!("/posts/{}/comments", segment(post_id)), Some("comment"))
    }

    // Messaging

    pub fn conversations() -> Self {
        Self::get("/conversations", "conversations")
    }

    pub fn messages(conversation_id: &EntityId) -> Self {
        Self::get(
            format!("/conversations/{}/messages", segment(conversation_id)),
            "messages",
        )
    }

    pub fn send_message() -> Self {
        Self::post("/messages", Some("message"))
    }

    // Notifications

    pub fn notifications() -> Self {
        Self::get("/notifications", "notifications")
    }

    // People

    pub fn search() -> Self {
        Self::get("/search", "results")
    }

    pub fn profile(user_id: &EntityId) -> Self {
        Self::get(format!("/users/{}", segment(user_id)), "user")
    }

    pub fn follow(user_id: &EntityId) -> Self {
        Self::post(format!("/users/{}/follow", segment(user_id)), Some("user"))
    }

    pub fn unfollow(user_id: &EntityId) -> Self {
        Self::post(format!("/users/{}/unfollow", segment(user_id)), Some("user"))
    }

    pub fn hire_request() -> Self {
        Self::post("/hire-requests", None)
    }

    pub fn follow_options() -> Self {
        Self::get("/follow-options", "follow_options").anonymous()
    }
}

fn segment(id: &EntityId) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}
