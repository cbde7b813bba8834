//! Service layer
//!
//! One service per screen. Each is assembled from the generic resource
//! pieces and holds no fetch or rollback logic of its own.

mod auth;
mod comments;
mod conversation;
mod feed;
mod inbox;
mod notifications;
mod profile;
mod search;

pub use auth::{AuthService, Registration};
pub use comments::CommentsService;
pub use conversation::ConversationService;
pub use feed::FeedService;
pub use inbox::InboxService;
pub use notifications::{NotificationService, NotificationTab};
pub use profile::{ProfileService, follow_options};
pub use search::SearchService;

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;

use crate::api::{ApiClient, Endpoint};
use crate::auth::AuthContext;
use crate::resource::{Item, ResourceSlot};

/// Collaborators shared by every service
#[derive(Clone)]
pub struct ServiceContext {
    pub api: ApiClient,
    pub auth: Arc<AuthContext>,
    /// Freshness window for slots; `None` refetches on every load
    pub freshness: Option<Duration>,
}

impl ServiceContext {
    pub fn new(api: ApiClient, auth: Arc<AuthContext>, freshness: Option<Duration>) -> Self {
        Self {
            api,
            auth,
            freshness,
        }
    }

    /// Slot fetching a list endpoint with the token current at fetch time
    pub(crate) fn list_slot<T>(&self, name: &'static str, endpoint: Endpoint) -> ResourceSlot<T>
    where
        T: Item + DeserializeOwned,
    {
        let api = self.api.clone();
        let auth = self.auth.clone();
        ResourceSlot::new(name, self.freshness, move || {
            let api = api.clone();
            let token = auth.token();
            let endpoint = endpoint.clone();
            async move { api.fetch::<Vec<T>>(&endpoint, &[], token).await }.boxed()
        })
    }
}
