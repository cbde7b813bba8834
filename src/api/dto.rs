//! API response DTOs
//!
//! Typed shapes of the records the remote API returns. Fields the server
//! may omit carry `#[serde(default)]` so a sparse record still parses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::resource::Item;
use crate::util::media::{FileKind, classify};

// =============================================================================
// ID Types
// =============================================================================

/// Identifier of a remote record
///
/// The API returns numeric ids for some resources and string ids for
/// others; both deserialize into the same string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Client-side id for a record the server has not assigned one yet
    pub fn provisional() -> Self {
        Self(format!("local-{}", ulid::Ulid::new()))
    }

    pub fn is_provisional(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => EntityId(text),
            RawId::Unsigned(n) => EntityId(n.to_string()),
            RawId::Signed(n) => EntityId(n.to_string()),
        })
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// =============================================================================
// People
// =============================================================================

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Login/register response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Compact person record (post authors, search results)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub is_following: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
            headline: None,
            is_following: false,
        }
    }
}

/// Full profile page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub is_following: bool,
    /// Tutors accept hire requests
    #[serde(default)]
    pub is_tutor: bool,
}

/// Account suggested during onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowOption {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

// =============================================================================
// Feed
// =============================================================================

/// Media attached to a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl MediaAttachment {
    pub fn kind(&self) -> FileKind {
        classify(&self.url, self.mime_type.as_deref())
    }
}

/// Feed post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: EntityId,
    #[serde(default)]
    pub author: Option<UserSummary>,
    #[serde(default, alias = "body")]
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaAttachment>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub in_readlist: bool,
}

/// Scheduled or running live class shown above the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveClass {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub host: Option<UserSummary>,
    #[serde(default = "epoch")]
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub is_live: bool,
}

/// Comment under a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: EntityId,
    #[serde(default)]
    pub author: Option<UserSummary>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    /// Not yet confirmed by the server
    #[serde(skip)]
    pub pending: bool,
}

// =============================================================================
// Messaging
// =============================================================================

/// Inbox row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    #[serde(default)]
    pub participant: Option<UserSummary>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default = "epoch")]
    pub last_message_at: DateTime<Utc>,
    #[serde(default)]
    pub unread_count: i64,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    #[serde(default)]
    pub conversation_id: Option<EntityId>,
    #[serde(default)]
    pub sender_id: Option<EntityId>,
    #[serde(default)]
    pub body: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    /// Not yet confirmed by the server
    #[serde(skip)]
    pub pending: bool,
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Message,
    HireRequest,
    #[serde(other)]
    Other,
}

/// Activity notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub actor: Option<UserSummary>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub post_id: Option<EntityId>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

// =============================================================================
// Item impls
// =============================================================================

macro_rules! impl_item {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Item for $ty {
                type Id = EntityId;

                fn id(&self) -> &EntityId {
                    &self.id
                }
            }
        )*
    };
}

impl_item!(
    Post,
    LiveClass,
    Comment,
    Conversation,
    Message,
    Notification,
    UserSummary,
    Profile,
    FollowOption,
);
