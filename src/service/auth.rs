//! Sign-in, registration and session persistence

use std::sync::Arc;

use serde_json::json;

use crate::api::{ApiClient, Endpoint, Session, User};
use crate::auth::{AuthContext, CredentialStore};
use crate::error::{AppError, Result};

const TOKEN_KEY: &str = "rustroom.session.token";
const USER_KEY: &str = "rustroom.session.user";
const MIN_PASSWORD_LEN: usize = 8;

/// Fields of the sign-up form
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name is required.".to_string()));
        }
        let username = self.username.trim();
        if username.is_empty()
            || !username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(AppError::Validation(
                "Username may only contain letters, digits, '.' and '_'.".to_string(),
            ));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters.",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("Enter a valid email address.".to_string()))
    }
}

/// Manages the signed-in session
pub struct AuthService {
    api: ApiClient,
    auth: Arc<AuthContext>,
    store: Arc<dyn CredentialStore>,
}

impl AuthService {
    pub fn new(api: ApiClient, auth: Arc<AuthContext>, store: Arc<dyn CredentialStore>) -> Self {
        Self { api, auth, store }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AppError::Validation("Enter your password.".to_string()));
        }

        let session: Session = self
            .api
            .submit(
                &Endpoint::login(),
                json!({ "email": email.trim(), "password": password }),
                None,
            )
            .await
            .map_err(|e| match e {
                // 401 here means bad credentials, not an expired session
                AppError::Unauthorized => {
                    AppError::Validation("Incorrect email or password.".to_string())
                }
                other => other,
            })?;
        self.establish(session)
    }

    pub async fn register(&self, form: &Registration) -> Result<User> {
        form.validate()?;

        let session: Session = self
            .api
            .submit(
                &Endpoint::register(),
                json!({
                    "name": form.name.trim(),
                    "username": form.username.trim(),
                    "email": form.email.trim(),
                    "password": form.password,
                }),
                None,
            )
            .await?;
        self.establish(session)
    }

    /// Load a persisted session into the auth context
    ///
    /// Returns `false` when nothing usable was stored. An unreadable user
    /// record is discarded rather than reported.
    pub fn restore(&self) -> Result<bool> {
        let Some(token) = self.store.get(TOKEN_KEY)? else {
            return Ok(false);
        };
        let Some(user_json) = self.store.get(USER_KEY)? else {
            return Ok(false);
        };

        match serde_json::from_str::<User>(&user_json) {
            Ok(user) => {
                self.auth.set_session(Session { token, user });
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored session");
                self.forget()?;
                Ok(false)
            }
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.auth.clear();
        self.forget()
    }

    fn establish(&self, session: Session) -> Result<User> {
        let user_json =
            serde_json::to_string(&session.user).map_err(|e| AppError::Internal(e.into()))?;
        self.store.set(TOKEN_KEY, &session.token)?;
        self.store.set(USER_KEY, &user_json)?;

        let user = session.user.clone();
        self.auth.set_session(session);
        Ok(user)
    }

    fn forget(&self) -> Result<()> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use serde_json::json;

    use super::*;
    use crate::auth::{MemoryCredentialStore, MockCredentialStore};
    use crate::http::HttpError;
    use crate::http::testing::ScriptedTransport;

    fn service(
        transport: &Arc<ScriptedTransport>,
        store: Arc<dyn CredentialStore>,
    ) -> (AuthService, Arc<AuthContext>) {
        let auth = Arc::new(AuthContext::new());
        (
            AuthService::new(ApiClient::new(transport.clone()), auth.clone(), store),
            auth,
        )
    }

    fn session_reply() -> serde_json::Value {
        json!({ "token": "t-123", "user": { "id": 5, "name": "Ada", "username": "ada" } })
    }

    #[tokio::test]
    async fn login_signs_in_and_persists() {
        let transport = ScriptedTransport::new();
        transport.reply(Ok(session_reply()));
        let store = Arc::new(MemoryCredentialStore::new());
        let (service, auth) = service(&transport, store.clone());

        let user = service.login(" ada@example.com ", "hunter22").await.unwrap();

        assert_eq!(user.username, "ada");
        assert_eq!(auth.token().as_deref(), Some("t-123"));
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("t-123"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/auth/login");
        assert_eq!(sent.token, None);
        assert_eq!(
            sent.body,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" }))
        );
    }

    #[tokio::test]
    async fn rejected_credentials_leave_the_user_signed_out() {
        let transport = ScriptedTransport::new();
        transport.reply(Err(HttpError::server(400, "Invalid credentials")));
        let (service, auth) = service(&transport, Arc::new(MemoryCredentialStore::new()));

        let err = service.login("ada@example.com", "wrong").await.unwrap_err();

        assert_eq!(err.user_message(), "Invalid credentials");
        assert!(!auth.is_signed_in());
    }

    #[tokio::test]
    async fn registration_is_validated_locally() {
        let transport = ScriptedTransport::new();
        let (service, _) = service(&transport, Arc::new(MemoryCredentialStore::new()));
        let mut form = Registration {
            name: "Ada".into(),
            username: "ada lovelace".into(),
            email: "ada@example.com".into(),
            password: "longenough".into(),
        };

        assert!(matches!(service.register(&form).await, Err(AppError::Validation(_))));
        form.username = "ada".into();
        form.email = "not-an-email".into();
        assert!(matches!(service.register(&form).await, Err(AppError::Validation(_))));
        form.email = "ada@example.com".into();
        form.password = "short".into();
        assert!(matches!(service.register(&form).await, Err(AppError::Validation(_))));
        assert_eq!(transport.request_count(), 0);

        form.password = "longenough".into();
        transport.reply(Ok(session_reply()));
        service.register(&form).await.unwrap();
        assert_eq!(transport.requests()[0].path, "/auth/register");
    }

    #[test]
    fn restore_reads_the_store() {
        let transport = ScriptedTransport::new();
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .with(eq(TOKEN_KEY))
            .returning(|_| Ok(Some("t-9".to_string())));
        store
            .expect_get()
            .with(eq(USER_KEY))
            .returning(|_| Ok(Some(r#"{"id":"u9","name":"Bo","username":"bo"}"#.to_string())));
        let (service, auth) = service(&transport, Arc::new(store));

        assert!(service.restore().unwrap());
        assert_eq!(auth.token().as_deref(), Some("t-9"));
        assert_eq!(auth.user().unwrap().username, "bo");
    }

    #[test]
    fn corrupt_stored_user_is_discarded() {
        let transport = ScriptedTransport::new();
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .with(eq(TOKEN_KEY))
            .returning(|_| Ok(Some("t".to_string())));
        store
            .expect_get()
            .with(eq(USER_KEY))
            .returning(|_| Ok(Some("{not json".to_string())));
        store.expect_remove().times(2).returning(|_| Ok(()));
        let (service, auth) = service(&transport, Arc::new(store));

        assert!(!service.restore().unwrap());
        assert!(!auth.is_signed_in());
    }

    #[test]
    fn store_failure_is_propagated() {
        let transport = ScriptedTransport::new();
        let mut store = MockCredentialStore::new();
        store
            .expect_get()
            .returning(|_| Err(AppError::Config("keychain locked".to_string())));
        let (service, _) = service(&transport, Arc::new(store));

        assert!(matches!(service.restore(), Err(AppError::Config(_))));
    }

    #[test]
    fn logout_clears_context_and_store() {
        let transport = ScriptedTransport::new();
        let mut store = MockCredentialStore::new();
        store.expect_remove().with(eq(TOKEN_KEY)).times(1).returning(|_| Ok(()));
        store.expect_remove().with(eq(USER_KEY)).times(1).returning(|_| Ok(()));
        let (service, auth) = service(&transport, Arc::new(store));
        auth.set_session(Session {
            token: "t".into(),
            user: User {
                id: "1".into(),
                name: String::new(),
                username: "x".into(),
                email: None,
                avatar_url: None,
            },
        });

        service.logout().unwrap();
        assert!(!auth.is_signed_in());
    }
}
