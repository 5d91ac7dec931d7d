// src/auth.rs
//! Simulated authentication.
//!
//! Two states: Anonymous (no session) and Authenticated. Login only checks
//! that the email is registered; the password is never compared against
//! anything. Tokens come from [`crate::token`] and are never verified.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::IdentityStore;
use crate::models::auth::{Session, User};
use crate::storage::{keys, Storage};
use crate::token::fabricate_token;
use crate::validation::{validate_email, validate_password};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct AuthManager {
    storage: Storage,
    identities: Arc<IdentityStore>,
    config: AuthConfig,
    session: Mutex<Option<Session>>,
    pending: AtomicUsize,
}

/// Marks a login/register call as in flight for as long as it lives.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AuthManager {
    /// Restores a persisted session if both token and user are present.
    pub fn new(storage: Storage, identities: Arc<IdentityStore>, config: AuthConfig) -> Self {
        let token: Option<String> = storage.get(keys::AUTH_TOKEN, None);
        let user: Option<User> = storage.get(keys::USER_DATA, None);

        let session = match (token, user) {
            (Some(token), Some(user)) => {
                tracing::info!(user_id = %user.id, "restored persisted session");
                Some(Session { token, user })
            }
            (None, None) => None,
            _ => {
                tracing::warn!("ignoring incomplete persisted session");
                None
            }
        };

        Self {
            storage,
            identities,
            config,
            session: Mutex::new(session),
            pending: AtomicUsize::new(0),
        }
    }

    fn session_guard(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _loading = LoadingGuard::new(&self.pending);

        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        tokio::time::sleep(self.config.login_latency).await;

        let user = match self.identities.find_by_email(email) {
            Some(user) => user,
            None => {
                tracing::warn!("login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session = Session {
            token: fabricate_token(Utc::now()),
            user,
        };
        self.establish(session.clone());
        tracing::info!(user_id = %session.user.id, "user logged in");
        Ok(session)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, AuthError> {
        let _loading = LoadingGuard::new(&self.pending);

        if !validate_email(email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }
        if let Some(message) = validate_password(password) {
            return Err(AuthError::Validation(message.to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".to_string()));
        }
        if self.identities.contains_email(email) {
            return Err(AuthError::DuplicateEmail);
        }

        tokio::time::sleep(self.config.register_latency).await;

        let user = User {
            id: crate::utils::generate_id(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        // Re-checks the email, so a registration that raced this one still loses.
        self.identities.insert(user.clone())?;

        let session = Session {
            token: fabricate_token(Utc::now()),
            user,
        };
        self.establish(session.clone());
        tracing::info!(user_id = %session.user.id, "user registered");
        Ok(session)
    }

    /// Always ends Anonymous, whatever the previous state.
    pub fn logout(&self) {
        let previous = self.session_guard().take();

        for key in [keys::AUTH_TOKEN, keys::USER_DATA] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "failed to clear persisted session");
            }
        }

        if let Some(session) = previous {
            tracing::info!(user_id = %session.user.id, "user logged out");
        }
    }

    fn establish(&self, session: Session) {
        if let Err(e) = self.storage.set(keys::AUTH_TOKEN, &session.token) {
            tracing::warn!(error = %e, "failed to persist auth token");
        }
        if let Err(e) = self.storage.set(keys::USER_DATA, &session.user) {
            tracing::warn!(error = %e, "failed to persist user data");
        }
        *self.session_guard() = Some(session);
    }

    pub fn session(&self) -> Option<Session> {
        self.session_guard().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session_guard().as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.session_guard().as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session_guard().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}
