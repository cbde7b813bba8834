//! RustRoom - client core for a learning-focused social app
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - One service per screen (feed, inbox, search, ...)        │
//! │  - Display projections, validation                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Resource Layer                           │
//! │  - ResourceSlot: coalesced fetch + loading/error state      │
//! │  - DebouncedQuery: delayed, generation-tagged search        │
//! │  - MutationApplier: optimistic change + rollback            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       API Layer                              │
//! │  - Typed DTOs and endpoint catalogue                        │
//! │  - Transport trait (reqwest implementation)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: DTOs, endpoints, envelope decoding
//! - `http`: transport adapter and its error classification
//! - `resource`: generic remote-state building blocks
//! - `service`: screen services
//! - `auth`: session context and credential persistence
//! - `util`: link detection, file kinds, relative time
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod resource;
pub mod service;
pub mod telemetry;
pub mod util;

use std::sync::Arc;

pub use error::{AppError, Result};

use api::{ApiClient, EntityId, FollowOption};
use auth::{AuthContext, CredentialStore};
use http::{ReqwestTransport, Transport};
use resource::ResourceSlot;
use service::{
    AuthService, CommentsService, ConversationService, FeedService, InboxService,
    NotificationService, ProfileService, SearchService, ServiceContext,
};

/// Application state shared by all screens
///
/// Cheap to clone; every clone talks to the same transport and sees the
/// same session.
#[derive(Clone)]
pub struct AppContext {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Typed client for the remote API
    pub api: ApiClient,

    /// Signed-in session, read by services at request time
    pub auth: Arc<AuthContext>,
}

impl AppContext {
    /// Build the context with the reqwest transport
    ///
    /// # Errors
    /// Returns `Config` if the configuration is invalid
    pub fn new(config: config::AppConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.api)?;
        tracing::info!(base_url = %config.api.base_url, "API client ready");
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build the context over any transport
    pub fn with_transport(config: config::AppConfig, transport: Arc<dyn Transport>) -> Self {
        metrics::init_metrics();
        Self {
            config: Arc::new(config),
            api: ApiClient::new(transport),
            auth: Arc::new(AuthContext::new()),
        }
    }

    fn services(&self) -> ServiceContext {
        ServiceContext::new(
            self.api.clone(),
            self.auth.clone(),
            self.config.cache.freshness(),
        )
    }

    pub fn auth_service(&self, store: Arc<dyn CredentialStore>) -> AuthService {
        AuthService::new(self.api.clone(), self.auth.clone(), store)
    }

    pub fn feed(&self) -> FeedService {
        FeedService::new(self.services())
    }

    pub fn comments(&self, post_id: EntityId) -> CommentsService {
        CommentsService::new(self.services(), post_id)
    }

    pub fn inbox(&self) -> InboxService {
        InboxService::new(self.services())
    }

    pub fn conversation(&self, conversation_id: EntityId) -> ConversationService {
        ConversationService::new(self.services(), conversation_id)
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.services())
    }

    pub fn search(&self) -> SearchService {
        SearchService::new(self.services(), self.config.search.debounce())
    }

    pub fn profile(&self, user_id: EntityId) -> ProfileService {
        ProfileService::new(self.services(), user_id)
    }

    pub fn follow_options(&self) -> ResourceSlot<FollowOption> {
        service::follow_options(&self.services())
    }
}
