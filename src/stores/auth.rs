//! Login session over the shared user collection.
//!
//! Passwords are kept only as SHA-256 digests in [`Credentials`], keyed by
//! normalized email. A successful login persists an [`AuthSession`]
//! snapshot so a restart can pick the session up again.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ClinicConfig;
use crate::mock_api::{ApiError, MockApi, Patch};
use crate::models::{AuthSession, User, UserRole, UserUpdate};
use crate::storage::{load_json, save_json, KeyValueStorage, StorageError};
use crate::store::Store;

/// Storage key of the persisted session snapshot.
pub const SESSION_KEY: &str = "auth_session";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,
    #[error("Wrong password")]
    WrongPassword,
    #[error("Account is not active")]
    AccountInactive,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Email already in use")]
    EmailTaken,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ═══════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════

/// Hash a password using SHA-256.
pub fn hash_password(password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whether a user other than `except_id` already holds `email`.
pub(crate) fn email_in_use(users: &MockApi<User>, email: &str, except_id: Option<&str>) -> bool {
    let email = normalize_email(email);
    users
        .snapshot()
        .iter()
        .any(|u| Some(u.id.as_str()) != except_id && normalize_email(&u.email) == email)
}

/// Email → password digest.
#[derive(Debug, Default)]
pub struct Credentials {
    hashes: RwLock<HashMap<String, [u8; 32]>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_plaintext<'a>(pairs: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let credentials = Self::new();
        for (email, password) in pairs {
            credentials.set(email, password);
        }
        credentials
    }

    pub fn set(&self, email: &str, password: &str) {
        self.hashes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize_email(email), hash_password(password));
    }

    /// `None` when no credential exists for the email.
    pub fn verify(&self, email: &str, password: &str) -> Option<bool> {
        self.hashes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_email(email))
            .map(|stored| *stored == hash_password(password))
    }

    pub fn remove(&self, email: &str) -> bool {
        self.hashes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_email(email))
            .is_some()
    }

    pub fn rename(&self, old_email: &str, new_email: &str) {
        let mut hashes = self.hashes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(hash) = hashes.remove(&normalize_email(old_email)) {
            hashes.insert(normalize_email(new_email), hash);
        }
    }

    /// Replaces every credential at once.
    pub fn replace_all<'a>(&self, pairs: impl IntoIterator<Item = (&'a String, &'a String)>) {
        let fresh: HashMap<String, [u8; 32]> = pairs
            .into_iter()
            .map(|(email, password)| (normalize_email(email), hash_password(password)))
            .collect();
        *self.hashes.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn clear(&self) {
        self.hashes.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.hashes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ═══════════════════════════════════════════════════════════
// AuthStore
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    fn from_session(session: AuthSession) -> Self {
        Self {
            user: Some(session.user),
            token: Some(session.token),
            expires_at: Some(session.expires_at),
            ..Self::default()
        }
    }

    fn session(&self) -> Option<AuthSession> {
        Some(AuthSession {
            user: self.user.clone()?,
            token: self.token.clone()?,
            expires_at: self.expires_at?,
        })
    }
}

pub struct AuthStore {
    state: Store<AuthState>,
    users: Arc<MockApi<User>>,
    credentials: Arc<Credentials>,
    storage: Arc<dyn KeyValueStorage>,
    login_delay: Duration,
    session_ttl: chrono::Duration,
}

impl AuthStore {
    /// Restores an unexpired persisted session, if any.
    pub fn new(
        users: Arc<MockApi<User>>,
        credentials: Arc<Credentials>,
        storage: Arc<dyn KeyValueStorage>,
        config: &ClinicConfig,
    ) -> Self {
        let initial = match load_json::<AuthSession>(storage.as_ref(), SESSION_KEY) {
            Some(session) if !session.is_expired(Utc::now()) => {
                tracing::debug!(user_id = %session.user.id, "restored persisted session");
                AuthState::from_session(session)
            }
            _ => AuthState::default(),
        };
        Self {
            state: Store::new(initial),
            users,
            credentials,
            storage,
            login_delay: config.login_delay,
            session_ttl: config.session_ttl,
        }
    }

    pub fn store(&self) -> &Store<AuthState> {
        &self.state
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        tokio::time::sleep(self.login_delay).await;

        match self.authenticate(email, password).await {
            Ok(session) => {
                self.state.set(AuthState::from_session(session.clone()));
                tracing::info!(user_id = %session.user.id, role = %session.user.role, "login succeeded");
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                self.state.update(|s| {
                    s.is_loading = false;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let wanted = normalize_email(email);
        let user = self
            .users
            .snapshot()
            .into_iter()
            .find(|u| normalize_email(&u.email) == wanted)
            .ok_or(AuthError::UserNotFound)?;

        if self.credentials.verify(&user.email, password) != Some(true) {
            return Err(AuthError::WrongPassword);
        }
        if !user.is_active() {
            return Err(AuthError::AccountInactive);
        }

        let now = Utc::now();
        let user = self
            .users
            .update(
                &user.id,
                UserUpdate {
                    last_login: Some(now),
                    ..Default::default()
                },
            )
            .await?;
        let session = AuthSession {
            user,
            token: Uuid::new_v4().to_string(),
            expires_at: now + self.session_ttl,
        };
        save_json(self.storage.as_ref(), SESSION_KEY, &session)?;
        Ok(session)
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        let user_id = self.state.with(|s| s.user.as_ref().map(|u| u.id.clone()));
        self.state.set(AuthState::default());
        self.storage.remove(SESSION_KEY)?;
        if let Some(user_id) = user_id {
            tracing::info!(%user_id, "logged out");
        }
        Ok(())
    }

    /// Applies `update` to the logged-in user, both in the collection and in
    /// the persisted session. A changed email carries the login credential
    /// along.
    pub async fn update_profile(&self, update: UserUpdate) -> Result<User, AuthError> {
        let mut session = self.state.with(AuthState::session).ok_or(AuthError::NotLoggedIn)?;
        if let Some(email) = &update.email {
            if email_in_use(&self.users, email, Some(session.user.id.as_str())) {
                return Err(AuthError::EmailTaken);
            }
        }
        let old_email = session.user.email.clone();
        let user = match self.users.update(&session.user.id, update.clone()).await {
            Ok(user) => user,
            Err(ApiError::NotFound { .. }) => {
                update.apply(&mut session.user)?;
                session.user.updated_at = Utc::now();
                session.user
            }
            Err(e) => return Err(e.into()),
        };
        if normalize_email(&old_email) != normalize_email(&user.email) {
            self.credentials.rename(&old_email, &user.email);
        }
        session.user = user.clone();
        save_json(self.storage.as_ref(), SESSION_KEY, &session)?;
        self.state.update(|s| s.user = Some(user.clone()));
        Ok(user)
    }

    /// Re-reads the persisted session and checks it against the user
    /// collection. An expired session, a removed user or an inactive account
    /// clears the session and yields `false`.
    pub async fn validate_session(&self) -> Result<bool, AuthError> {
        let Some(session) = load_json::<AuthSession>(self.storage.as_ref(), SESSION_KEY) else {
            self.state.set(AuthState::default());
            return Ok(false);
        };

        let valid = !session.is_expired(Utc::now())
            && self
                .users
                .get_by_id(&session.user.id)
                .await
                .is_ok_and(|u| u.is_active());

        if valid {
            self.state.set(AuthState::from_session(session));
        } else {
            tracing::info!(user_id = %session.user.id, "clearing invalid session");
            self.logout()?;
        }
        Ok(valid)
    }

    // ── Derived views ───────────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.state
            .with(|s| s.user.is_some() && s.token.is_some())
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.with(|s| s.user.clone())
    }

    pub fn role(&self) -> Option<UserRole> {
        self.state.with(|s| s.user.as_ref().map(|u| u.role))
    }

    pub fn is_loading(&self) -> bool {
        self.state.with(|s| s.is_loading)
    }
}
