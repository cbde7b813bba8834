//! Authentication
//!
//! [`AuthContext`] holds the signed-in session. Services read the token
//! from it at call time, so signing in or out takes effect on the next
//! request without rebuilding anything.

mod store;

pub use store::{CredentialStore, MemoryCredentialStore};

#[cfg(test)]
pub use store::MockCredentialStore;

use parking_lot::RwLock;

use crate::api::{Session, User};

/// Current session, shared by every service
#[derive(Debug, Default)]
pub struct AuthContext {
    session: RwLock<Option<Session>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    /// Bearer token of the signed-in user
    pub fn token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.read().is_some()
    }

    pub fn set_session(&self, session: Session) {
        tracing::info!(user_id = %session.user.id, "Session established");
        *self.session.write() = Some(session);
    }

    pub fn clear(&self) {
        if self.session.write().take().is_some() {
            tracing::info!("Session cleared");
        }
    }
}
